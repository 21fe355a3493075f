//! # Adapters
//!
//! Durable state backends for the registry ledger.

pub mod storage;
