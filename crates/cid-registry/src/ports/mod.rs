//! # Ports Layer (Middle Hexagon)
//!
//! - **Driving Port (Inbound)**: `CidRegistryApi`
//! - **Driven Ports (Outbound)**: `WorldState`, `StateBackend`, `Ledger`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
