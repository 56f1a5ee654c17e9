//! Pond orchestration layer
//!
//! Ties the deposit ledger, commitment builder and claim verifier together
//! behind one async API. All mutation goes through the single pond actor.
//!
//! # Example
//!
//! ```no_run
//! use minnow_core::{Address, Config, Pond};
//!
//! #[tokio::main]
//! async fn main() -> minnow_core::Result<()> {
//!     let config = Config::default();
//!     let operator = config.distributor.operator;
//!     let pond = Pond::open(config).await?;
//!
//!     let alice = Address::parse("0x00000000000000000000000000000000000000a1")?;
//!     let receipt = pond.deposit(alice, 1_000_000_000_000_000_000).await?;
//!
//!     if let Some(closed) = receipt.closed_period {
//!         let tree = pond.commit_period(operator, closed).await?;
//!         let (leaf, proof) = tree.proof_for(&alice)?;
//!         pond.fund(leaf.entitlement).await?;
//!         pond.claim(closed, alice, proof, leaf.entitlement).await?;
//!     }
//!
//!     pond.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_pond_actor, PondHandle, PondState},
    commitment::{CommitmentBuilder, CommitmentTree},
    metrics::Metrics,
    types::{
        Address, Amount, ClaimReceipt, Commitment, Deposit, DepositReceipt, Hash, Period,
        PeriodIndex,
    },
    Config, Error, Result, Storage,
};
use std::time::Instant;

/// Main pond interface
#[derive(Debug)]
pub struct Pond {
    /// Actor handle for all state access
    handle: PondHandle,

    /// Prometheus metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Pond {
    /// Open the pond, replaying the journal when persistence is enabled
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let metrics = Metrics::new()?;

        let threshold = config.close_threshold_units()?;
        let mut state = PondState::new(
            threshold,
            config.distributor.operator,
            config.distributor.token,
        )?;

        let (storage, next_sequence) = if config.persistence.enabled {
            let storage = Storage::open(&config)?;
            match storage.load_threshold()? {
                Some(journaled) if journaled != threshold => {
                    return Err(Error::Config(format!(
                        "close_threshold is {} base units but the journal in {} was written with {}",
                        threshold,
                        config.data_dir.display(),
                        journaled
                    )));
                }
                Some(_) => {}
                None => storage.store_threshold(threshold)?,
            }
            let events = storage.load_events()?;
            state.replay(&events)?;
            (Some(storage), events.len() as u64)
        } else {
            tracing::warn!("Persistence disabled; pond state lives in memory only");
            (None, 0)
        };

        let handle = spawn_pond_actor(
            state,
            storage,
            next_sequence,
            config.actor.mailbox_capacity,
        );

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            threshold,
            operator = %config.distributor.operator,
            token = %config.distributor.token,
            "Pond opened"
        );
        if let Some(pond) = config.contracts.pond {
            tracing::info!("Pond contract at {}", pond);
        }
        if let Some(distributor) = config.contracts.distributor {
            tracing::info!("Distributor contract at {}", distributor);
        }

        Ok(Self {
            handle,
            metrics,
            config,
        })
    }

    /// Record a deposit into the open period
    pub async fn deposit(&self, depositor: Address, amount: Amount) -> Result<DepositReceipt> {
        let receipt = self.handle.deposit(depositor, amount).await?;
        self.metrics.record_deposit(receipt.closed_period.is_some());
        Ok(receipt)
    }

    /// Period snapshot by index
    pub async fn get_period(&self, index: PeriodIndex) -> Result<Period> {
        self.handle.get_period(index).await
    }

    /// Depositors of a period in deposit order
    pub async fn get_depositors(&self, index: PeriodIndex) -> Result<Vec<Deposit>> {
        self.handle.get_depositors(index).await
    }

    /// Number of periods ever created, the open one included
    pub async fn get_total_periods(&self) -> Result<u64> {
        self.handle.get_total_periods().await
    }

    /// The open period
    pub async fn current_period(&self) -> Result<Period> {
        self.handle.current_period().await
    }

    /// Build the commitment tree of a closed period without publishing it
    pub async fn build_commitment(&self, index: PeriodIndex) -> Result<CommitmentTree> {
        let period = self.handle.get_period(index).await?;
        CommitmentBuilder::build(&period)
    }

    /// Publish a commitment; only the operator may call this
    pub async fn register_commitment(&self, caller: Address, commitment: Commitment) -> Result<()> {
        self.handle.register_commitment(caller, commitment).await?;
        self.metrics.record_commitment();
        Ok(())
    }

    /// Build and publish the commitment of a closed period
    ///
    /// The returned tree serves proofs to the period's depositors.
    pub async fn commit_period(&self, caller: Address, index: PeriodIndex) -> Result<CommitmentTree> {
        let tree = self.build_commitment(index).await?;
        self.register_commitment(caller, tree.commitment()).await?;
        Ok(tree)
    }

    /// Registered commitment for a period
    pub async fn commitment(&self, period_index: PeriodIndex) -> Result<Option<Commitment>> {
        self.handle.commitment(period_index).await
    }

    /// Top up the payout reserve, returning the new reserve
    pub async fn fund(&self, amount: Amount) -> Result<Amount> {
        self.handle.fund(amount).await
    }

    /// Verify a claim against the period's commitment and pay it out
    pub async fn claim(
        &self,
        period_index: PeriodIndex,
        depositor: Address,
        proof: Vec<Hash>,
        entitlement: Amount,
    ) -> Result<ClaimReceipt> {
        let start = Instant::now();
        let result = self
            .handle
            .claim(period_index, depositor, proof, entitlement)
            .await;
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(_) => self.metrics.record_claim(true, elapsed),
            Err(Error::Concurrency(_)) => {}
            Err(e) => {
                self.metrics.record_claim(false, elapsed);
                tracing::warn!(
                    period_index,
                    depositor = %depositor,
                    error = %e,
                    "Claim rejected"
                );
            }
        }

        result
    }

    /// Whether a (period, depositor) pair has been paid out
    pub async fn is_claimed(&self, period_index: PeriodIndex, depositor: Address) -> Result<bool> {
        self.handle.is_claimed(period_index, depositor).await
    }

    /// Payout credited to an account so far
    pub async fn balance_of(&self, account: Address) -> Result<Amount> {
        self.handle.balance_of(account).await
    }

    /// Undistributed payout reserve
    pub async fn reserve(&self) -> Result<Amount> {
        self.handle.reserve().await
    }

    /// Get metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop the actor and close the journal
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await?;
        tracing::info!("Pond shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn in_memory_config() -> Config {
        let mut config = Config::default();
        config.persistence.enabled = false;
        config.pond.close_threshold = Decimal::from(100);
        config.pond.asset_decimals = 0;
        config
    }

    #[tokio::test]
    async fn test_commit_period_and_claim() {
        let config = in_memory_config();
        let operator = config.distributor.operator;
        let pond = Pond::open(config).await.unwrap();

        pond.deposit(addr(1), 30).await.unwrap();
        pond.deposit(addr(2), 30).await.unwrap();
        let receipt = pond.deposit(addr(3), 40).await.unwrap();
        assert_eq!(receipt.closed_period, Some(0));

        let tree = pond.commit_period(operator, 0).await.unwrap();
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(pond.commitment(0).await.unwrap(), Some(tree.commitment()));

        pond.fund(100).await.unwrap();
        let (leaf, proof) = tree.proof_for(&addr(2)).unwrap();
        let paid = pond.claim(0, addr(2), proof, leaf.entitlement).await.unwrap();
        assert_eq!(paid.amount, 30);
        assert_eq!(pond.balance_of(addr(2)).await.unwrap(), 30);
        assert_eq!(pond.reserve().await.unwrap(), 70);

        assert_eq!(pond.metrics().deposits_total.get(), 3);
        assert_eq!(pond.metrics().periods_closed_total.get(), 1);
        assert_eq!(pond.metrics().commitments_total.get(), 1);
        assert_eq!(pond.metrics().claims_total.get(), 1);

        pond.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_non_operator_cannot_commit() {
        let pond = Pond::open(in_memory_config()).await.unwrap();
        pond.deposit(addr(1), 100).await.unwrap();

        assert!(matches!(
            pond.commit_period(addr(9), 0).await,
            Err(Error::Unauthorized(_))
        ));
        assert_eq!(pond.commitment(0).await.unwrap(), None);
        assert_eq!(pond.metrics().commitments_total.get(), 0);

        pond.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_period_cannot_be_built() {
        let pond = Pond::open(in_memory_config()).await.unwrap();
        pond.deposit(addr(1), 10).await.unwrap();

        assert!(matches!(
            pond.build_commitment(0).await,
            Err(Error::PeriodOpen(0))
        ));
        assert!(matches!(
            pond.build_commitment(5).await,
            Err(Error::NotFound(_))
        ));

        pond.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_claim_is_counted() {
        let pond = Pond::open(in_memory_config()).await.unwrap();

        assert!(matches!(
            pond.claim(0, addr(1), Vec::new(), 10).await,
            Err(Error::NoCommitment(0))
        ));
        assert_eq!(pond.metrics().claims_rejected_total.get(), 1);
        assert!(!pond.is_claimed(0, addr(1)).await.unwrap());

        pond.shutdown().await.unwrap();
    }
}
