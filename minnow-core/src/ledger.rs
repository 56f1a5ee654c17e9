//! Deposit ledger
//!
//! Tracks deposits in sequential periods. Exactly one period is open at any
//! time; when a deposit brings its total to the closing threshold the period
//! is closed and its successor opened within the same call.
//!
//! Validation (`check_deposit`) is kept apart from mutation
//! (`apply_deposit`) so the actor can journal a deposit between the two.
//! Once a deposit passes the check, applying it cannot fail.

use crate::{
    types::{Address, Amount, Deposit, DepositReceipt, Period, PeriodIndex, PeriodStatus},
    Error, Result,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Period-based deposit ledger
#[derive(Debug, Clone)]
pub struct DepositLedger {
    /// Total that closes a period
    threshold: Amount,

    /// Closed periods, `closed[i].index == i`
    closed: Vec<Period>,

    /// The single open period
    open: Period,

    /// Depositor position within `open.depositors`
    positions: HashMap<Address, usize>,
}

impl DepositLedger {
    /// Create a ledger with period 0 open
    pub fn new(threshold: Amount) -> Result<Self> {
        if threshold == 0 {
            return Err(Error::InvalidAmount(
                "Closing threshold must be positive".to_string(),
            ));
        }

        Ok(Self {
            threshold,
            closed: Vec::new(),
            open: Period::open(0),
            positions: HashMap::new(),
        })
    }

    /// Closing threshold in base units
    pub fn threshold(&self) -> Amount {
        self.threshold
    }

    /// Record a deposit, closing the period if the threshold is reached
    pub fn deposit(&mut self, depositor: Address, amount: Amount) -> Result<DepositReceipt> {
        self.check_deposit(&depositor, amount)?;
        Ok(self.apply_deposit(depositor, amount, Utc::now()))
    }

    /// Validate a deposit without touching state
    pub fn check_deposit(&self, depositor: &Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(Error::InvalidAmount("Amount must be positive".to_string()));
        }
        if depositor.is_zero() {
            return Err(Error::InvalidAddress(
                "Zero address cannot deposit".to_string(),
            ));
        }
        self.open.total_deposited.checked_add(amount).ok_or_else(|| {
            Error::ArithmeticOverflow(format!(
                "period {} total {} + {}",
                self.open.index, self.open.total_deposited, amount
            ))
        })?;
        Ok(())
    }

    /// Apply a deposit that already passed `check_deposit`
    pub(crate) fn apply_deposit(
        &mut self,
        depositor: Address,
        amount: Amount,
        at: DateTime<Utc>,
    ) -> DepositReceipt {
        let period_index = self.open.index;

        match self.positions.get(&depositor) {
            Some(&position) => self.open.depositors[position].amount += amount,
            None => {
                self.positions.insert(depositor, self.open.depositors.len());
                self.open.depositors.push(Deposit {
                    depositor,
                    amount,
                    period: period_index,
                });
            }
        }
        self.open.total_deposited += amount;
        let period_total = self.open.total_deposited;

        tracing::debug!(
            period_index,
            depositor = %depositor,
            amount,
            period_total,
            "Deposit recorded"
        );

        let closed_period = if period_total >= self.threshold {
            self.close_open_period(at);
            Some(period_index)
        } else {
            None
        };

        DepositReceipt {
            period_index,
            depositor,
            amount,
            period_total,
            closed_period,
        }
    }

    /// Close the open period and open its successor
    fn close_open_period(&mut self, at: DateTime<Utc>) {
        let next = Period::open(self.open.index + 1);
        let mut period = std::mem::replace(&mut self.open, next);
        period.status = PeriodStatus::Closed;
        period.closed_at = Some(at);
        self.positions.clear();

        tracing::info!(
            period_index = period.index,
            total_deposited = period.total_deposited,
            depositors = period.depositors.len(),
            "Period closed"
        );

        self.closed.push(period);
    }

    /// Period snapshot by index
    pub fn get_period(&self, index: PeriodIndex) -> Result<&Period> {
        if index == self.open.index {
            return Ok(&self.open);
        }
        usize::try_from(index)
            .ok()
            .and_then(|i| self.closed.get(i))
            .ok_or_else(|| Error::NotFound(format!("period {}", index)))
    }

    /// Depositors of a period in ledger order
    pub fn get_depositors(&self, index: PeriodIndex) -> Result<&[Deposit]> {
        Ok(&self.get_period(index)?.depositors)
    }

    /// Number of periods ever created (always at least 1)
    pub fn total_periods(&self) -> u64 {
        self.open.index + 1
    }

    /// The open period
    pub fn current_period(&self) -> &Period {
        &self.open
    }
}
