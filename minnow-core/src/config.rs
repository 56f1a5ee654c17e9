//! Configuration for the pond
//!
//! Resolved contract addresses and the operator identity are passed in
//! explicitly; nothing is looked up from process-wide state.

use crate::{types::Address, types::Amount, units, Error};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Token used by the reference deployment
pub const DEFAULT_TOKEN: Address = Address::from_bytes([
    0x6f, 0xe8, 0x8a, 0x21, 0x18, 0x63, 0xd0, 0xd8, 0x18, 0x60, 0x80, 0x36, 0x88, 0x0c, 0x9a,
    0x4b, 0x0e, 0xa8, 0x67, 0x95,
]);

/// Pond configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Deposit ledger configuration
    pub pond: PondConfig,

    /// Claim distribution configuration
    pub distributor: DistributorConfig,

    /// Deployed contract addresses
    #[serde(default)]
    pub contracts: ContractsConfig,

    /// Actor configuration
    pub actor: ActorConfig,

    /// Journal persistence configuration
    pub persistence: PersistenceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/pond"),
            service_name: "minnow-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            pond: PondConfig::default(),
            distributor: DistributorConfig::default(),
            contracts: ContractsConfig::default(),
            actor: ActorConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

/// Deposit ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PondConfig {
    /// Period closes once its total reaches this many whole units
    pub close_threshold: Decimal,

    /// Decimals of the deposited asset
    pub asset_decimals: u32,
}

impl Default for PondConfig {
    fn default() -> Self {
        Self {
            close_threshold: Decimal::ONE, // 1 ETH
            asset_decimals: 18,
        }
    }
}

/// Claim distribution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributorConfig {
    /// Account allowed to register commitments
    pub operator: Address,

    /// Token paid out on claims
    pub token: Address,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            operator: Address::from_bytes([0x01; 20]),
            token: DEFAULT_TOKEN,
        }
    }
}

/// Addresses of deployed contracts, when backed by a chain deployment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Deposit pond contract
    pub pond: Option<Address>,

    /// Swap-and-claim contract
    pub distributor: Option<Address>,
}

/// Actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Bounded mailbox size
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1_000,
        }
    }
}

/// Journal persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Journal events to RocksDB; in-memory only when false
    pub enabled: bool,

    /// fsync every journal write
    pub sync_writes: bool,

    /// RocksDB tuning
    pub rocksdb: RocksDBConfig,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sync_writes: true,
            rocksdb: RocksDBConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("MINNOW_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(threshold) = std::env::var("MINNOW_CLOSE_THRESHOLD") {
            config.pond.close_threshold = threshold
                .parse()
                .map_err(|e| Error::Config(format!("MINNOW_CLOSE_THRESHOLD: {}", e)))?;
        }

        if let Ok(operator) = std::env::var("MINNOW_OPERATOR") {
            config.distributor.operator = Address::parse(&operator)
                .map_err(|e| Error::Config(format!("MINNOW_OPERATOR: {}", e)))?;
        }

        if let Ok(token) = std::env::var("MINNOW_TOKEN") {
            config.distributor.token = Address::parse(&token)
                .map_err(|e| Error::Config(format!("MINNOW_TOKEN: {}", e)))?;
        }

        if let Ok(enabled) = std::env::var("MINNOW_PERSISTENCE") {
            config.persistence.enabled = enabled != "0" && enabled != "false";
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> crate::Result<()> {
        if self.close_threshold_units()? == 0 {
            return Err(Error::Config("close_threshold must be positive".to_string()));
        }
        if self.distributor.operator.is_zero() {
            return Err(Error::Config("operator must not be the zero address".to_string()));
        }
        if self.actor.mailbox_capacity == 0 {
            return Err(Error::Config("mailbox_capacity must be positive".to_string()));
        }
        Ok(())
    }

    /// Closing threshold in base units
    pub fn close_threshold_units(&self) -> crate::Result<Amount> {
        units::parse_units(self.pond.close_threshold, self.pond.asset_decimals)
            .map_err(|e| Error::Config(format!("close_threshold: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "minnow-core");
        assert_eq!(config.pond.asset_decimals, 18);
        assert_eq!(config.distributor.token.to_string(), "0x6fe88a211863d0d818608036880c9a4b0ea86795");
        assert_eq!(config.close_threshold_units().unwrap(), 1_000_000_000_000_000_000);
        assert!(config.persistence.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_toml() {
        let raw = r#"
            data_dir = "/tmp/minnow"
            service_name = "pond"
            service_version = "0.1.0"

            [pond]
            close_threshold = "2.5"
            asset_decimals = 6

            [distributor]
            operator = "0x00000000000000000000000000000000000000aa"
            token = "0x6fe88a211863d0d818608036880c9a4b0ea86795"

            [contracts]
            pond = "0x5fbdb2315678afecb367f032d93f642f64180aa3"

            [actor]
            mailbox_capacity = 16

            [persistence]
            enabled = false
            sync_writes = false

            [persistence.rocksdb]
            write_buffer_size_mb = 8
            max_background_jobs = 1
            enable_statistics = false
        "#;

        let config: Config = toml::from_str(raw).unwrap();
        config.validate().unwrap();
        assert_eq!(config.close_threshold_units().unwrap(), 2_500_000);
        assert!(config.contracts.pond.is_some());
        assert!(config.contracts.distributor.is_none());
        assert!(!config.persistence.enabled);
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let mut config = Config::default();
        config.pond.close_threshold = Decimal::ZERO;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
