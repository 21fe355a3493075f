//! # Domain Layer (Inner Hexagon)
//!
//! The persisted record and the lifecycle rules that govern it. Nothing in
//! here touches the ledger directly.

pub mod entities;
pub mod lifecycle;

pub use entities::*;
pub use lifecycle::*;
