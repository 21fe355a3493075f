//! # Adapters Layer (Outer Hexagon)
//!
//! - `ledger`: `SerialLedger`, the serialized transactional ledger
//! - `memory_backend`: `MemoryBackend`, committed state in memory
//!
//! Durable backends implement `StateBackend` outside this crate.

pub mod ledger;
pub mod memory_backend;

pub use ledger::{SerialLedger, TxState};
pub use memory_backend::MemoryBackend;
