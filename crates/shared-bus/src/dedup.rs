//! # Delivery Deduplication
//!
//! The transport delivers at-least-once, so a worker may observe the same
//! committed event more than once. `DeliveryDedup` remembers the most
//! recent transaction ids it has accepted and rejects repeats.
//!
//! The window is bounded by count rather than time: once full, the oldest
//! id is forgotten first.

use crate::events::LedgerEvent;
use crate::DEFAULT_DEDUP_WINDOW;
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

/// Bounded set of already-seen transaction ids.
#[derive(Debug)]
pub struct DeliveryDedup {
    /// Ids in arrival order, oldest first.
    order: VecDeque<Uuid>,
    /// Same ids, for O(1) lookup.
    seen: HashSet<Uuid>,
    /// Maximum ids retained.
    window: usize,
}

impl DeliveryDedup {
    /// Create with the default window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(DEFAULT_DEDUP_WINDOW)
    }

    /// Create with a custom window (at least 1).
    #[must_use]
    pub fn with_window(window: usize) -> Self {
        let window = window.max(1);
        Self {
            order: VecDeque::with_capacity(window),
            seen: HashSet::with_capacity(window),
            window,
        }
    }

    /// Record a delivery.
    ///
    /// Returns `true` the first time an event's transaction id is seen and
    /// `false` for a redelivery still inside the window.
    pub fn accept(&mut self, event: &LedgerEvent) -> bool {
        self.accept_id(event.tx_id)
    }

    /// Record a delivery by transaction id.
    pub fn accept_id(&mut self, tx_id: Uuid) -> bool {
        if self.seen.contains(&tx_id) {
            return false;
        }

        if self.order.len() == self.window {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }

        self.order.push_back(tx_id);
        self.seen.insert(tx_id);
        true
    }

    /// Number of ids currently remembered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if nothing has been accepted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for DeliveryDedup {
    fn default() -> Self {
        Self::new()
    }
}
