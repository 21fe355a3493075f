//! # Ledger Events
//!
//! The envelope delivered to off-chain workers for every committed
//! chaincode event, and the filter subscribers use to select them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chaincode event attached to a committed transaction.
///
/// `payload` is opaque to the bus; its encoding is agreed between the
/// chaincode that emits it and the worker that consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Transaction that emitted the event.
    pub tx_id: Uuid,
    /// Ledger commit sequence of that transaction (strictly increasing).
    pub sequence: u64,
    /// Channel the transaction was committed on.
    pub channel: String,
    /// Chaincode that emitted the event.
    pub chaincode: String,
    /// Protocol-fixed event name.
    pub name: String,
    /// Event payload bytes.
    pub payload: Vec<u8>,
}

impl LedgerEvent {
    /// Payload interpreted as UTF-8, for logging.
    #[must_use]
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Filter for subscribing to a subset of events.
///
/// Empty `names` means every event name; `chaincode` of `None` means
/// every chaincode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Event names to receive.
    pub names: Vec<String>,
    /// Restrict to events from one chaincode.
    pub chaincode: Option<String>,
}

impl EventFilter {
    /// Receive every event.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Receive only events with one of the given names.
    #[must_use]
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            chaincode: None,
        }
    }

    /// Restrict this filter to one chaincode.
    #[must_use]
    pub fn for_chaincode(mut self, chaincode: impl Into<String>) -> Self {
        self.chaincode = Some(chaincode.into());
        self
    }

    /// Check whether an event passes this filter.
    #[must_use]
    pub fn matches(&self, event: &LedgerEvent) -> bool {
        if let Some(chaincode) = &self.chaincode {
            if *chaincode != event.chaincode {
                return false;
            }
        }
        self.names.is_empty() || self.names.iter().any(|n| *n == event.name)
    }
}

#[cfg(test)]
pub(crate) fn test_event(sequence: u64, name: &str) -> LedgerEvent {
    LedgerEvent {
        tx_id: Uuid::new_v4(),
        sequence,
        channel: "mychannel".to_string(),
        chaincode: "cidrecord".to_string(),
        name: name.to_string(),
        payload: br#"{"vector":"0.1"}"#.to_vec(),
    }
}
