//! # Driven Ports (SPI - Outbound)
//!
//! The ledger the chaincode runs against. Consensus, replication and
//! durability live behind these traits; the chaincode only needs
//! transactional key-value access with range iteration.
//!
//! - [`WorldState`]: the key-value view one transaction reads and writes
//! - [`StateBackend`]: committed storage that applies a write set atomically
//! - [`Ledger`]: runs a unit of work as one serialized transaction

use crate::errors::{LedgerError, RegistryError};
use crate::events::ChaincodeEvent;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One key-value pair read from the world state.
pub type StateEntry = (String, Vec<u8>);

/// Iterator over a key range. Not restartable.
pub type StateIter<'a> = Box<dyn Iterator<Item = Result<StateEntry, LedgerError>> + 'a>;

/// Pending writes of a transaction. `None` marks a deletion.
pub type WriteSet = BTreeMap<String, Option<Vec<u8>>>;

// =============================================================================
// WORLD STATE
// =============================================================================

/// Key-value world state as seen from inside one transaction.
pub trait WorldState {
    /// Read the value under `key`, `None` if absent.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Stage a write of `value` under `key`.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    /// Stage the deletion of `key`. Deleting an absent key is not an error here.
    fn del_state(&mut self, key: &str) -> Result<(), LedgerError>;

    /// Iterate keys in `[start, end)` in key order.
    ///
    /// An empty `start` or `end` leaves that side unbounded, so
    /// `state_by_range("", "")` covers the whole key space.
    fn state_by_range(&self, start: &str, end: &str) -> Result<StateIter<'_>, LedgerError>;
}

/// True if `key` falls in `[start, end)` with empty bounds open.
#[must_use]
pub fn in_range(key: &str, start: &str, end: &str) -> bool {
    (start.is_empty() || key >= start) && (end.is_empty() || key < end)
}

// =============================================================================
// STATE BACKEND
// =============================================================================

/// Committed key-value storage underneath a [`Ledger`].
pub trait StateBackend: Send + Sync {
    /// Read a committed value.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Committed entries in `[start, end)`, key order.
    ///
    /// Backends that can iterate in place (RocksDB) stream entries as the
    /// caller pulls them; the in-memory backend hands out a copy of the range.
    fn scan(&self, start: &str, end: &str) -> Result<StateIter<'_>, LedgerError>;

    /// Apply a write set. Either every write lands or none does.
    fn apply(&self, writes: WriteSet) -> Result<(), LedgerError>;
}

// =============================================================================
// LEDGER
// =============================================================================

/// Result of a chaincode operation plus the event it wants emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutcome<T> {
    /// Value returned to the caller.
    pub value: T,
    /// Event to attach to the transaction.
    pub event: Option<ChaincodeEvent>,
}

impl<T> TxOutcome<T> {
    /// Outcome without an event.
    pub fn value(value: T) -> Self {
        Self { value, event: None }
    }

    /// Outcome that emits `event` on commit.
    pub fn with_event(value: T, event: ChaincodeEvent) -> Self {
        Self {
            value,
            event: Some(event),
        }
    }
}

/// A committed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Committed<T> {
    /// Transaction id supplied by the submitter.
    pub tx_id: Uuid,
    /// Commit sequence assigned by the ledger.
    pub sequence: u64,
    /// Value returned by the operation.
    pub value: T,
    /// Event attached to the transaction.
    pub event: Option<ChaincodeEvent>,
}

/// A ledger that executes chaincode work transactionally.
///
/// ## Guarantees required of implementations
///
/// 1. Transactions are serialized: the existence check and the write of
///    one transaction are never interleaved with another's
/// 2. A failed unit of work leaves no writes behind
/// 3. Committed transactions get strictly increasing sequence numbers
pub trait Ledger: Send + Sync {
    /// Execute `work` and commit its writes and event.
    fn submit<T, F>(&self, tx_id: Uuid, work: F) -> Result<Committed<T>, RegistryError>
    where
        F: FnOnce(&mut dyn WorldState) -> Result<TxOutcome<T>, RegistryError>;

    /// Execute `work` read-only. Writes are discarded and nothing commits.
    fn evaluate<T, F>(&self, work: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&mut dyn WorldState) -> Result<TxOutcome<T>, RegistryError>;

    /// Sequence of the last committed transaction (0 before the first).
    fn height(&self) -> Result<u64, RegistryError>;
}

// =============================================================================
// TESTS
// =============================================================================
