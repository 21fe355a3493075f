//! # Registry Container
//!
//! Holds the ledger, event bus and registry service the runtime wires
//! together, plus the configuration they were built from.

pub mod config;
pub mod registry;

pub use config::{BusConfig, ConfigError, NodeConfig, StorageConfig};
pub use registry::{RegistryContainer, RuntimeService};
