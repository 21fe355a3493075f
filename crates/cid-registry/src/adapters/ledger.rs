//! # Serialized Ledger
//!
//! A [`Ledger`] that runs one transaction at a time over a [`StateBackend`].
//!
//! Each transaction works on a [`TxState`] overlay: reads fall through to
//! the committed state, writes are buffered in a write set. On success the
//! write set is applied in one call and the commit sequence advances. On
//! failure the overlay is dropped, so a rejected transaction leaves no
//! writes behind.
//!
//! The commit lock is held from the first read to the apply, which is what
//! makes the lifecycle guards' check-then-act atomic.

use crate::errors::{LedgerError, RegistryError};
use crate::ports::outbound::{
    in_range, Committed, Ledger, StateBackend, StateEntry, StateIter, TxOutcome, WorldState,
    WriteSet,
};
use std::cmp::Ordering;
use std::iter::Peekable;
use std::sync::Mutex;
use tracing::{debug, trace};
use uuid::Uuid;

/// Ledger that serializes transactions behind one commit lock.
#[derive(Debug)]
pub struct SerialLedger<B: StateBackend> {
    backend: B,
    /// Sequence of the last committed transaction. Doubles as the commit lock.
    height: Mutex<u64>,
}

impl<B: StateBackend> SerialLedger<B> {
    /// Wrap a backend. The sequence starts at 0.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            height: Mutex::new(0),
        }
    }

    /// The committed state.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: StateBackend> Ledger for SerialLedger<B> {
    fn submit<T, F>(&self, tx_id: Uuid, work: F) -> Result<Committed<T>, RegistryError>
    where
        F: FnOnce(&mut dyn WorldState) -> Result<TxOutcome<T>, RegistryError>,
    {
        let mut height = self.height.lock().map_err(|_| LedgerError::LockPoisoned)?;

        let mut tx = TxState::new(&self.backend);
        let outcome = work(&mut tx)?;
        let writes = tx.into_writes();
        let write_count = writes.len();

        self.backend.apply(writes)?;
        *height += 1;

        debug!(%tx_id, sequence = *height, writes = write_count, "Transaction committed");
        Ok(Committed {
            tx_id,
            sequence: *height,
            value: outcome.value,
            event: outcome.event,
        })
    }

    fn evaluate<T, F>(&self, work: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&mut dyn WorldState) -> Result<TxOutcome<T>, RegistryError>,
    {
        let _guard = self.height.lock().map_err(|_| LedgerError::LockPoisoned)?;

        let mut tx = TxState::new(&self.backend);
        let outcome = work(&mut tx)?;
        if outcome.event.is_some() {
            trace!("Event from evaluated transaction discarded");
        }
        Ok(outcome.value)
    }

    fn height(&self) -> Result<u64, RegistryError> {
        let height = self.height.lock().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(*height)
    }
}

// =============================================================================
// TRANSACTION OVERLAY
// =============================================================================

/// World state of one in-flight transaction.
///
/// Reads see the transaction's own writes.
pub struct TxState<'a, B: StateBackend + ?Sized> {
    backend: &'a B,
    writes: WriteSet,
}

impl<'a, B: StateBackend + ?Sized> TxState<'a, B> {
    /// Start an empty overlay over `backend`.
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            writes: WriteSet::new(),
        }
    }

    /// Buffered writes, consumed at commit.
    pub fn into_writes(self) -> WriteSet {
        self.writes
    }
}

impl<B: StateBackend + ?Sized> WorldState for TxState<'_, B> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        match self.writes.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => self.backend.read(key),
        }
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::InvalidKey(key.to_string()));
        }
        self.writes.insert(key.to_string(), Some(value));
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<(), LedgerError> {
        self.writes.insert(key.to_string(), None);
        Ok(())
    }

    fn state_by_range(&self, start: &str, end: &str) -> Result<StateIter<'_>, LedgerError> {
        let pending: Vec<(String, Option<Vec<u8>>)> = self
            .writes
            .iter()
            .filter(|(k, _)| in_range(k, start, end))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Box::new(MergedRange {
            committed: self.backend.scan(start, end)?.peekable(),
            pending: pending.into_iter().peekable(),
        }))
    }
}

/// Committed range with a transaction's pending writes laid over it.
///
/// Both sides are key ordered, so the merge pulls from the backend one
/// entry at a time. A pending write replaces the committed entry with the
/// same key; a pending deletion hides it.
struct MergedRange<'a> {
    committed: Peekable<StateIter<'a>>,
    pending: Peekable<std::vec::IntoIter<(String, Option<Vec<u8>>)>>,
}

enum Side {
    Committed,
    Pending,
    Both,
}

impl Iterator for MergedRange<'_> {
    type Item = Result<StateEntry, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let side = match (self.committed.peek(), self.pending.peek()) {
                (None, None) => return None,
                (Some(_), None) | (Some(Err(_)), Some(_)) => Side::Committed,
                (None, Some(_)) => Side::Pending,
                (Some(Ok((committed, _))), Some((pending, _))) => match pending.cmp(committed) {
                    Ordering::Less => Side::Pending,
                    Ordering::Equal => Side::Both,
                    Ordering::Greater => Side::Committed,
                },
            };

            match side {
                Side::Committed => return self.committed.next(),
                Side::Both => {
                    self.committed.next();
                }
                Side::Pending => {}
            }

            if let Some((key, Some(value))) = self.pending.next() {
                return Some(Ok((key, value)));
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_backend::MemoryBackend;
    use crate::contract::CidRecordContract;
    use std::sync::Arc;

    fn ledger() -> SerialLedger<MemoryBackend> {
        SerialLedger::new(MemoryBackend::new())
    }

    #[test]
    fn test_commit_applies_writes_and_advances_height() {
        let ledger = ledger();
        let tx_id = Uuid::new_v4();

        let committed = ledger
            .submit(tx_id, |state| {
                state.put_state("k", b"v".to_vec())?;
                Ok(TxOutcome::value(7))
            })
            .unwrap();

        assert_eq!(committed.tx_id, tx_id);
        assert_eq!(committed.sequence, 1);
        assert_eq!(committed.value, 7);
        assert_eq!(ledger.height().unwrap(), 1);
        assert_eq!(ledger.backend().read("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_failed_work_leaves_nothing() {
        let ledger = ledger();

        let result: Result<Committed<()>, _> = ledger.submit(Uuid::new_v4(), |state| {
            state.put_state("k", b"v".to_vec())?;
            Err(RegistryError::already_exists("k"))
        });

        assert!(result.is_err());
        assert_eq!(ledger.height().unwrap(), 0);
        assert!(ledger.backend().is_empty().unwrap());
    }

    #[test]
    fn test_evaluate_never_commits() {
        let ledger = ledger();

        let value = ledger
            .evaluate(|state| {
                state.put_state("k", b"v".to_vec())?;
                Ok(TxOutcome::value(state.get_state("k")?))
            })
            .unwrap();

        // Own write visible inside, gone outside
        assert_eq!(value, Some(b"v".to_vec()));
        assert_eq!(ledger.height().unwrap(), 0);
        assert!(ledger.backend().is_empty().unwrap());
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let ledger = ledger();
        let err = ledger
            .submit(Uuid::new_v4(), |state| {
                state.put_state("", b"v".to_vec())?;
                Ok(TxOutcome::value(()))
            })
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::StoreUnavailable(LedgerError::InvalidKey(String::new()))
        );
    }

    #[test]
    fn test_range_merges_pending_writes() {
        let backend = MemoryBackend::new();
        for key in ["a", "b", "c"] {
            backend.insert_raw(key, key.as_bytes().to_vec()).unwrap();
        }
        let mut tx = TxState::new(&backend);
        tx.del_state("b").unwrap();
        tx.put_state("bb", b"new".to_vec()).unwrap();

        let keys: Vec<_> = tx
            .state_by_range("", "")
            .unwrap()
            .map(|entry| entry.unwrap().0)
            .collect();
        assert_eq!(keys, vec!["a", "bb", "c"]);

        let bounded: Vec<_> = tx
            .state_by_range("b", "c")
            .unwrap()
            .map(|entry| entry.unwrap().0)
            .collect();
        assert_eq!(bounded, vec!["bb"]);
    }

    /// Backend that counts how many committed entries have been pulled.
    struct CountingBackend {
        inner: MemoryBackend,
        pulled: std::sync::atomic::AtomicUsize,
    }

    impl StateBackend for CountingBackend {
        fn read(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
            self.inner.read(key)
        }

        fn scan(&self, start: &str, end: &str) -> Result<StateIter<'_>, LedgerError> {
            let pulled = &self.pulled;
            Ok(Box::new(self.inner.scan(start, end)?.inspect(move |_| {
                pulled.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })))
        }

        fn apply(&self, writes: WriteSet) -> Result<(), LedgerError> {
            self.inner.apply(writes)
        }
    }

    #[test]
    fn test_range_pulls_committed_entries_on_demand() {
        let backend = CountingBackend {
            inner: MemoryBackend::new(),
            pulled: std::sync::atomic::AtomicUsize::new(0),
        };
        for key in ["a", "b", "c", "d"] {
            backend.inner.insert_raw(key, b"x".to_vec()).unwrap();
        }
        let mut tx = TxState::new(&backend);
        tx.put_state("a", b"new".to_vec()).unwrap();

        let first: Vec<_> = tx
            .state_by_range("", "")
            .unwrap()
            .take(2)
            .map(|entry| entry.unwrap())
            .collect();

        assert_eq!(
            first,
            vec![("a".to_string(), b"new".to_vec()), ("b".to_string(), b"x".to_vec())]
        );
        // "c" and "d" are never read
        assert_eq!(backend.pulled.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_range_surfaces_backend_error() {
        struct BrokenScan;

        impl StateBackend for BrokenScan {
            fn read(&self, _key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
                Ok(None)
            }

            fn scan(&self, _start: &str, _end: &str) -> Result<StateIter<'_>, LedgerError> {
                Ok(Box::new(
                    vec![
                        Ok(("a".to_string(), b"1".to_vec())),
                        Err(LedgerError::Backend("iterator failed".to_string())),
                    ]
                    .into_iter(),
                ))
            }

            fn apply(&self, _writes: WriteSet) -> Result<(), LedgerError> {
                Ok(())
            }
        }

        let mut tx = TxState::new(&BrokenScan);
        tx.put_state("z", b"pending".to_vec()).unwrap();

        let entries: Vec<_> = tx.state_by_range("", "").unwrap().collect();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_ok());
        assert!(entries[1].is_err());
        assert_eq!(entries[2], Ok(("z".to_string(), b"pending".to_vec())));
    }

    #[test]
    fn test_offline_backend_fails_commit() {
        let ledger = ledger();
        ledger.backend().set_offline(true);

        let err = ledger
            .submit(Uuid::new_v4(), |_state| Ok(TxOutcome::value(())))
            .unwrap_err();
        assert_eq!(err.code(), "STORE_UNAVAILABLE");
        assert_eq!(ledger.height().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_confirms_exactly_one_wins() {
        let ledger = Arc::new(ledger());
        let contract = CidRecordContract::default();

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let ledger = Arc::clone(&ledger);
                    scope.spawn(move || {
                        let cid = format!("Qm{i}");
                        ledger.submit(Uuid::new_v4(), |state| {
                            contract.confirm_cid_upload(state, "abc123", &cid)
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let won = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(RegistryError::AlreadyExists { .. })))
            .count();
        assert_eq!(won, 1);
        assert_eq!(rejected, 7);
        assert_eq!(ledger.height().unwrap(), 1);
    }
}
