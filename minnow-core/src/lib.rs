//! Minnow Pond Core
//!
//! Period-based deposit pond with Merkle-committed claim distribution.
//!
//! # Architecture
//!
//! - **Deposit Ledger**: Sequential periods, each closed once its total
//!   reaches the threshold
//! - **Commitments**: Sorted-pair keccak Merkle root over a closed period's
//!   depositors, published once per period
//! - **Claim Verifier**: Proof-gated payout, at most once per leaf
//! - **Single Writer**: One actor serializes every state change
//! - **Event Journal**: Accepted transitions are journaled to RocksDB before
//!   they are applied and replayed on open
//!
//! # Invariants
//!
//! - Exactly one period is open at any time
//! - A closed period's depositor list never changes
//! - A registered commitment is never replaced
//! - A claim record, once set, is never cleared

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod commitment;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod merkle;
pub mod metrics;
pub mod pond;
pub mod storage;
pub mod treasury;
pub mod types;
pub mod units;
pub mod verifier;

// Re-exports
pub use commitment::{CommitmentBuilder, CommitmentTree};
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::DepositLedger;
pub use pond::Pond;
pub use storage::Storage;
pub use treasury::Treasury;
pub use types::{
    Address, Amount, ClaimLeaf, ClaimReceipt, ClaimRecord, Commitment, Deposit, DepositReceipt,
    Hash, Period, PeriodIndex, PeriodStatus, PondEvent,
};
pub use verifier::ClaimVerifier;
