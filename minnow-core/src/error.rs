//! Error types for the pond

use thiserror::Error;

/// Result type for pond operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pond errors
///
/// Every protocol error leaves state untouched: a failed call never applies
/// half of a deposit, commitment or claim.
#[derive(Error, Debug)]
pub enum Error {
    /// Deposit or conversion amount is zero, negative or too precise
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Unknown period, leaf or depositor
    #[error("Not found: {0}")]
    NotFound(String),

    /// A commitment already exists for the period
    #[error("Commitment already registered for period {0}")]
    AlreadyCommitted(u64),

    /// No commitment has been registered for the period
    #[error("No commitment registered for period {0}")]
    NoCommitment(u64),

    /// Recomputed root does not match the registered root
    #[error("Invalid proof for {depositor} in period {period_index}")]
    InvalidProof {
        /// Period the claim targeted
        period_index: u64,
        /// Depositor the claim was made for
        depositor: String,
    },

    /// The (period, depositor) pair has already been paid out
    #[error("Already claimed: {depositor} in period {period_index}")]
    AlreadyClaimed {
        /// Period the claim targeted
        period_index: u64,
        /// Depositor the claim was made for
        depositor: String,
    },

    /// Payout could not be delivered; the claim stays unset
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Caller is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Operation requires a closed period
    #[error("Period {0} is still open")]
    PeriodOpen(u64),

    /// Closed period without deposits cannot be committed
    #[error("Period {0} has no deposits")]
    EmptyPeriod(u64),

    /// Checked arithmetic overflowed
    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    /// Malformed address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl Error {
    /// Whether the caller may safely retry the same request.
    ///
    /// Only a failed transfer qualifies: the claim record is never set when
    /// the payout does not go through.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransferFailed(_))
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
