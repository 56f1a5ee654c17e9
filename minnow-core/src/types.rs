//! Core types for the pond
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact integer arithmetic (base units, never floats)

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 256-bit hash (Merkle nodes, roots, leaves)
pub type Hash = [u8; 32];

/// Amount in base units of the deposited asset (e.g. wei)
pub type Amount = u128;

/// Period index, starting at 0
pub type PeriodIndex = u64;

/// 20-byte account identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// Raw length in bytes
    pub const LEN: usize = 20;

    /// The all-zero address
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check for the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Parse from hex, with or without `0x` prefix
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let cleaned = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if cleaned.len() != Self::LEN * 2 {
            return Err(Error::InvalidAddress(format!(
                "expected 40 hex chars, got {}",
                cleaned.len()
            )));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(cleaned, &mut bytes)
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", input, e)))?;
        Ok(Self(bytes))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A depositor's position within one period
///
/// Repeat deposits from the same address in the same period are merged
/// into a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    /// Depositor account
    pub depositor: Address,

    /// Accumulated amount for this period
    pub amount: Amount,

    /// Period the deposit belongs to
    pub period: PeriodIndex,
}

/// Period status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodStatus {
    /// Accepting deposits
    Open,
    /// Threshold reached, depositor list frozen
    Closed,
}

/// A deposit period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Sequential index
    pub index: PeriodIndex,

    /// Current status
    pub status: PeriodStatus,

    /// Sum of all deposits in the period
    pub total_deposited: Amount,

    /// When the period closed
    pub closed_at: Option<DateTime<Utc>>,

    /// Depositors in first-deposit order
    pub depositors: Vec<Deposit>,
}

impl Period {
    /// Fresh open period
    pub fn open(index: PeriodIndex) -> Self {
        Self {
            index,
            status: PeriodStatus::Open,
            total_deposited: 0,
            closed_at: None,
            depositors: Vec::new(),
        }
    }

    /// Check if the period still accepts deposits
    pub fn is_open(&self) -> bool {
        self.status == PeriodStatus::Open
    }

    /// Deposit entry for an address, if any
    pub fn deposit_of(&self, depositor: &Address) -> Option<&Deposit> {
        self.depositors.iter().find(|d| &d.depositor == depositor)
    }
}

/// Published Merkle commitment over a closed period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    /// Period the commitment covers
    pub period_index: PeriodIndex,

    /// Merkle root
    pub root: Hash,

    /// Number of leaves
    pub leaf_count: usize,
}

/// Claimable entry committed to by a Merkle leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimLeaf {
    /// Period the leaf belongs to
    pub period_index: PeriodIndex,

    /// Recipient
    pub depositor: Address,

    /// Amount the recipient may claim
    pub entitlement: Amount,
}

impl ClaimLeaf {
    /// Leaf hash under the fixed encoding
    pub fn hash(&self) -> Hash {
        crate::crypto::leaf_hash(self.entitlement, &self.depositor)
    }
}

/// Claim state for one (period, depositor) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Period
    pub period_index: PeriodIndex,

    /// Depositor
    pub depositor: Address,

    /// Whether the payout was delivered
    pub claimed: bool,
}

/// Result of an accepted deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// Period the deposit landed in
    pub period_index: PeriodIndex,

    /// Depositor
    pub depositor: Address,

    /// Amount of this deposit
    pub amount: Amount,

    /// Period total after the deposit
    pub period_total: Amount,

    /// Set when this deposit closed the period
    pub closed_period: Option<PeriodIndex>,
}

/// Result of a successful claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    /// Period claimed from
    pub period_index: PeriodIndex,

    /// Recipient
    pub depositor: Address,

    /// Amount transferred
    pub amount: Amount,

    /// Token that was transferred
    pub token: Address,
}

/// Journaled state transition
///
/// Events carry every input needed to replay them, including the deposit
/// timestamp, so the same journal always rebuilds the same state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PondEvent {
    /// Deposit accepted into the open period
    Deposited {
        /// Depositor
        depositor: Address,
        /// Amount in base units
        amount: Amount,
        /// Acceptance time (becomes `closed_at` if the deposit closes the period)
        at: DateTime<Utc>,
    },

    /// Distribution reserve topped up
    Funded {
        /// Amount in base units
        amount: Amount,
    },

    /// Commitment published for a closed period
    CommitmentRegistered {
        /// The commitment
        commitment: Commitment,
    },

    /// Claim verified and paid out
    Claimed {
        /// Period claimed from
        period_index: PeriodIndex,
        /// Recipient
        depositor: Address,
        /// Amount transferred
        amount: Amount,
    },
}
