//! # Event Publisher
//!
//! The ledger side of the bus. Publishing is fire-and-forget: the caller
//! learns how many subscriptions were live when the event went out, never
//! whether any worker acted on it.

use crate::events::{EventFilter, LedgerEvent};
use crate::subscriber::{EventStream, EventSubscriber, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Publishing side of the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Hand a committed event to the bus.
    ///
    /// Returns the number of subscriptions it reached; zero means it was
    /// dropped.
    async fn publish(&self, event: LedgerEvent) -> usize;

    /// Events handed to the bus so far, delivered or not.
    fn events_published(&self) -> u64;
}

/// Single-process bus over a `tokio` broadcast channel.
///
/// Every subscription buffers up to `capacity` events; beyond that the
/// oldest are overwritten and the subscription counts them as missed.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<LedgerEvent>,
    capacity: usize,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl InMemoryEventBus {
    /// Bus with [`DEFAULT_CHANNEL_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus buffering `capacity` events per subscription (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            capacity,
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Subscribe to events matching `filter`.
    ///
    /// Only events published after this call are seen.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(
            names = ?filter.names,
            chaincode = ?filter.chaincode,
            live = self.sender.receiver_count() + 1,
            "Subscription opened"
        );
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// [`subscribe`](Self::subscribe) as a stream.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        self.subscribe(filter).into_stream()
    }

    /// Live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Per-subscription buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events published while no subscription was live.
    #[must_use]
    pub fn events_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: LedgerEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let tx_id = event.tx_id;
        let sequence = event.sequence;

        match self.sender.send(event) {
            Ok(reached) => {
                debug!(%tx_id, sequence, reached, "Event published");
                reached
            }
            Err(broadcast::error::SendError(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    %tx_id,
                    sequence,
                    event = %event.name,
                    "No live subscription, event dropped"
                );
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
