//! # Shared Bus - Committed Event Transport
//!
//! Carries chaincode events from the ledger to off-chain workers once the
//! emitting transaction has committed.
//!
//! ## Delivery Model
//!
//! ```text
//! ┌──────────────┐   commit    ┌──────────────┐   recv()   ┌──────────────┐
//! │   Registry   │ ──────────→ │  Event Bus   │ ─────────→ │   Off-chain  │
//! │   service    │  publish()  │  (broadcast) │            │    worker    │
//! └──────────────┘             └──────────────┘            └──────────────┘
//!                                                                 │
//!                               follow-up invocation ←────────────┘
//! ```
//!
//! - Events are published only after the ledger commits the transaction
//! - Every event carries the commit `sequence`, so consumers see commit order
//! - Delivery is at-least-once; consumers drop redeliveries with [`DeliveryDedup`]
//! - Publishing never acknowledges: an event with no subscriber is dropped

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod dedup;
pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use dedup::DeliveryDedup;
pub use events::{EventFilter, LedgerEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Default number of transaction ids remembered by a [`DeliveryDedup`].
pub const DEFAULT_DEDUP_WINDOW: usize = 4096;
