//! # Production Storage Adapters
//!
//! ## Usage
//!
//! Enable the `rocksdb` feature and set `CID_DATA_DIR`:
//!
//! ```toml
//! node-runtime = { path = "...", features = ["rocksdb"] }
//! ```
//!
//! Without it the node keeps state in `cid_registry::adapters::MemoryBackend`
//! and loses it on exit.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_backend;

#[cfg(feature = "rocksdb")]
pub use rocksdb_backend::{RocksDbBackend, RocksDbConfig};

pub use cid_registry::adapters::MemoryBackend;
