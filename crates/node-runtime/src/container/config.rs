//! # Node Configuration
//!
//! Runtime configuration with defaults and environment overrides.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `CID_CHANNEL` | `registry.channel` | `mychannel` |
//! | `CID_CHAINCODE` | `registry.chaincode` | `cidrecord` |
//! | `CID_BUS_CAPACITY` | `bus.capacity` | 1000 |
//! | `CID_DATA_DIR` | `storage.data_dir` | unset (in-memory state) |
//! | `CID_LOG_LEVEL` | `log_level` | `info` |

use cid_registry::service::ServiceConfig;
use shared_bus::DEFAULT_CHANNEL_CAPACITY;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable names.
pub mod env {
    /// Channel stamped on events.
    pub const CHANNEL: &str = "CID_CHANNEL";
    /// Chaincode name stamped on events.
    pub const CHAINCODE: &str = "CID_CHAINCODE";
    /// Event bus buffer per subscriber.
    pub const BUS_CAPACITY: &str = "CID_BUS_CAPACITY";
    /// Directory for durable state.
    pub const DATA_DIR: &str = "CID_DATA_DIR";
    /// Log level when `RUST_LOG` is unset.
    pub const LOG_LEVEL: &str = "CID_LOG_LEVEL";
}

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Registry service configuration.
    pub registry: ServiceConfig,
    /// Event bus configuration.
    pub bus: BusConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Default log filter directive.
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            registry: ServiceConfig::default(),
            bus: BusConfig::default(),
            storage: StorageConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

/// Event bus configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Events buffered per subscriber before it lags.
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory for durable state. `None` keeps state in memory.
    pub data_dir: Option<PathBuf>,
    /// fsync every commit.
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            sync_writes: true,
        }
    }
}

impl NodeConfig {
    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(channel) = lookup(env::CHANNEL) {
            config.registry.channel = channel;
        }
        if let Some(chaincode) = lookup(env::CHAINCODE) {
            config.registry.chaincode = chaincode;
        }
        if let Some(raw) = lookup(env::BUS_CAPACITY) {
            config.bus.capacity = parse_usize(env::BUS_CAPACITY, &raw)?;
        }
        if let Some(dir) = lookup(env::DATA_DIR).filter(|d| !d.is_empty()) {
            config.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup(env::LOG_LEVEL) {
            config.log_level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runtime cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.channel.is_empty() {
            return Err(ConfigError::Empty(env::CHANNEL));
        }
        if self.registry.chaincode.is_empty() {
            return Err(ConfigError::Empty(env::CHAINCODE));
        }
        if self.bus.capacity == 0 {
            return Err(ConfigError::Zero(env::BUS_CAPACITY));
        }
        Ok(())
    }
}

fn parse_usize(var: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric setting did not parse.
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber {
        /// Variable name.
        var: &'static str,
        /// Rejected value.
        value: String,
    },

    /// A setting that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// A setting that must be non-empty is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),
}
