//! # Node Runtime Library
//!
//! Wiring for the CID registry node. The main entry point is the `main.rs`
//! binary, which reads JSON-line invocations from stdin.
//!
//! ## Modules
//!
//! - `container/` - Configuration and the wired ledger, bus and service
//! - `handlers/` - Event log and invocation handlers
//! - `adapters/` - Durable state backends
//! - `runtime` - Startup and shutdown sequencing

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod runtime;

pub use container::{ConfigError, NodeConfig, RegistryContainer};
pub use runtime::NodeRuntime;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
