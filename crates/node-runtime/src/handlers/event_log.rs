//! # Event Log Handler
//!
//! Subscribes to every committed event and writes one structured log line
//! per transaction. Redeliveries are dropped by transaction id.

use serde_json::json;
use shared_bus::{DeliveryDedup, LedgerEvent, Subscription};
use tokio::sync::watch;
use tracing::{debug, info};

/// Counts reported when the handler stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventLogSummary {
    /// Events logged.
    pub logged: u64,
    /// Redeliveries dropped.
    pub duplicates: u64,
    /// Events overwritten before the handler read them.
    pub missed: u64,
}

/// Handler that logs committed events.
pub struct EventLogHandler {
    subscription: Subscription,
    dedup: DeliveryDedup,
    summary: EventLogSummary,
}

impl EventLogHandler {
    /// Create a handler reading from `subscription`.
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            dedup: DeliveryDedup::new(),
            summary: EventLogSummary::default(),
        }
    }

    /// Log one event. Returns `false` for a redelivery.
    pub fn handle(&mut self, event: &LedgerEvent) -> bool {
        if !self.dedup.accept(event) {
            self.summary.duplicates += 1;
            debug!(tx_id = %event.tx_id, "[cid] Dropping redelivered event");
            return false;
        }

        self.summary.logged += 1;
        info!(
            "EVENT_FLOW_JSON {}",
            json!({
                "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
                "channel": event.channel,
                "chaincode": event.chaincode,
                "event_type": event.name,
                "tx_id": event.tx_id.to_string(),
                "sequence": event.sequence,
                "payload_bytes": event.payload.len(),
            })
        );
        true
    }

    /// Run until the bus closes or `shutdown` flips to `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> EventLogSummary {
        info!("[cid] Event log handler started");

        loop {
            tokio::select! {
                received = self.subscription.recv() => match received {
                    Some(event) => {
                        self.handle(&event);
                    }
                    None => {
                        info!("[cid] Event bus closed");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("[cid] Shutdown signal received");
                        break;
                    }
                }
            }
        }

        self.summary.missed = self.subscription.missed();
        info!(
            logged = self.summary.logged,
            duplicates = self.summary.duplicates,
            missed = self.summary.missed,
            "[cid] Event log handler stopped"
        );
        self.summary
    }
}
