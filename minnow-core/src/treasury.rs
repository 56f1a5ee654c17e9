//! Distribution treasury
//!
//! Holds the reserve that claims are paid from and the balances credited to
//! claimants. Transfers are local and bounded; a short reserve makes the
//! transfer fail before anything is moved.

use crate::{
    types::{Address, Amount},
    Error, Result,
};
use std::collections::HashMap;

/// Reserve and claimant balances of the distributed token
#[derive(Debug, Clone, Default)]
pub struct Treasury {
    reserve: Amount,
    balances: HashMap<Address, Amount>,
}

impl Treasury {
    /// Empty treasury
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `amount` can be added to the reserve
    pub fn check_fund(&self, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(Error::InvalidAmount("Funding must be positive".to_string()));
        }
        self.reserve
            .checked_add(amount)
            .map(|_| ())
            .ok_or_else(|| Error::ArithmeticOverflow(format!("reserve {} + {}", self.reserve, amount)))
    }

    /// Add to the reserve
    pub fn fund(&mut self, amount: Amount) -> Result<Amount> {
        self.check_fund(amount)?;
        self.reserve += amount;
        Ok(self.reserve)
    }

    /// Check that the reserve covers a transfer
    pub fn check_transfer(&self, amount: Amount) -> Result<()> {
        if amount > self.reserve {
            return Err(Error::TransferFailed(format!(
                "reserve {} cannot cover {}",
                self.reserve, amount
            )));
        }
        Ok(())
    }

    /// Move `amount` from the reserve to `to`
    pub fn transfer(&mut self, to: &Address, amount: Amount) -> Result<()> {
        self.check_transfer(amount)?;
        self.reserve -= amount;
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    /// Undistributed reserve
    pub fn reserve(&self) -> Amount {
        self.reserve
    }

    /// Amount credited to an account
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }
}
