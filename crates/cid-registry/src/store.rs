//! # Record Store
//!
//! Typed access to `CidRecord`s in the world state, keyed by hash.
//!
//! ## Contract
//!
//! | Operation | Absent key | Bad bytes | Ledger failure |
//! |-----------|-----------|-----------|----------------|
//! | `exists` | `Ok(false)` | `Ok(true)` | `StoreUnavailable` |
//! | `get` | `NotFound` | `Decode` | `StoreUnavailable` |
//! | `put` | writes | - | `StoreUnavailable` |
//! | `delete` | `NotFound` | deletes | `StoreUnavailable` |
//! | `scan_all` | - | entry skipped | item is `StoreUnavailable` |
//!
//! `put` overwrites at this layer. The lifecycle guards are what keep the
//! registry write-once.
//!
//! ## Lenient scans
//!
//! `scan_all` skips entries that do not decode instead of failing. A
//! malformed legacy entry must not block enumeration of the rest; only a
//! ledger failure ends the scan with an error.
//!
//! Entries are pulled from the ledger as the scan advances. The RocksDB
//! backend reads them in place; the in-memory backend serves a copy of the
//! range taken when the scan starts.

use crate::domain::entities::CidRecord;
use crate::errors::RegistryError;
use crate::ports::outbound::{StateIter, WorldState};
use tracing::warn;

/// Record store over a transaction's world state.
pub struct RecordStore<'a, S: WorldState + ?Sized> {
    state: &'a mut S,
}

impl<'a, S: WorldState + ?Sized> RecordStore<'a, S> {
    /// Wrap a world state.
    pub fn new(state: &'a mut S) -> Self {
        Self { state }
    }

    /// Whether any value is stored under `hash`.
    pub fn exists(&self, hash: &str) -> Result<bool, RegistryError> {
        Ok(self.state.get_state(hash)?.is_some())
    }

    /// Stored bytes under `hash`, `None` if absent.
    pub fn get_raw(&self, hash: &str) -> Result<Option<Vec<u8>>, RegistryError> {
        Ok(self.state.get_state(hash)?)
    }

    /// Decoded record under `hash`.
    pub fn get(&self, hash: &str) -> Result<CidRecord, RegistryError> {
        let bytes = self
            .get_raw(hash)?
            .ok_or_else(|| RegistryError::not_found(hash))?;
        CidRecord::decode(&bytes)
    }

    /// Write `record` under `hash`.
    pub fn put(&mut self, hash: &str, record: &CidRecord) -> Result<(), RegistryError> {
        let bytes = record.encode()?;
        self.state.put_state(hash, bytes)?;
        Ok(())
    }

    /// Remove the value under `hash`.
    pub fn delete(&mut self, hash: &str) -> Result<(), RegistryError> {
        if !self.exists(hash)? {
            return Err(RegistryError::not_found(hash));
        }
        self.state.del_state(hash)?;
        Ok(())
    }

    /// Lazily iterate every record over the full key range.
    pub fn scan_all(&self) -> Result<RecordScan<'_>, RegistryError> {
        let inner = self.state.state_by_range("", "")?;
        Ok(RecordScan { inner })
    }
}

/// Iterator returned by [`RecordStore::scan_all`].
///
/// Yields `Err` only for ledger failures; undecodable entries are skipped.
pub struct RecordScan<'a> {
    inner: StateIter<'a>,
}

impl Iterator for RecordScan<'_> {
    type Item = Result<CidRecord, RegistryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Err(e) => return Some(Err(e.into())),
                Ok((key, bytes)) => match CidRecord::decode(&bytes) {
                    Ok(record) => return Some(Ok(record)),
                    Err(e) => {
                        warn!(key = %key, error = %e, "Skipping undecodable record");
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LedgerError;
    use crate::ports::outbound::in_range;
    use std::collections::BTreeMap;

    /// Plain map world state, writes applied immediately.
    #[derive(Default)]
    struct MapState(BTreeMap<String, Vec<u8>>);

    impl WorldState for MapState {
        fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
            Ok(self.0.get(key).cloned())
        }

        fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
            self.0.insert(key.to_string(), value);
            Ok(())
        }

        fn del_state(&mut self, key: &str) -> Result<(), LedgerError> {
            self.0.remove(key);
            Ok(())
        }

        fn state_by_range(&self, start: &str, end: &str) -> Result<StateIter<'_>, LedgerError> {
            let (start, end) = (start.to_owned(), end.to_owned());
            Ok(Box::new(
                self.0
                    .iter()
                    .filter(move |(k, _)| in_range(k, &start, &end))
                    .map(|(k, v)| Ok((k.clone(), v.clone()))),
            ))
        }
    }

    /// World state whose reads always fail.
    struct DownState;

    impl WorldState for DownState {
        fn get_state(&self, _key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
            Err(LedgerError::Backend("peer unreachable".into()))
        }

        fn put_state(&mut self, _key: &str, _value: Vec<u8>) -> Result<(), LedgerError> {
            Err(LedgerError::Backend("peer unreachable".into()))
        }

        fn del_state(&mut self, _key: &str) -> Result<(), LedgerError> {
            Err(LedgerError::Backend("peer unreachable".into()))
        }

        fn state_by_range(&self, _start: &str, _end: &str) -> Result<StateIter<'_>, LedgerError> {
            Ok(Box::new(std::iter::once(Err(LedgerError::Backend(
                "iterator broke".into(),
            )))))
        }
    }

    #[test]
    fn test_put_get_exists() {
        let mut state = MapState::default();
        let mut store = RecordStore::new(&mut state);

        assert!(!store.exists("h").unwrap());
        store.put("h", &CidRecord::new("h", "Qm1")).unwrap();
        assert!(store.exists("h").unwrap());
        assert_eq!(store.get("h").unwrap(), CidRecord::new("h", "Qm1"));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let mut state = MapState::default();
        let store = RecordStore::new(&mut state);

        assert_eq!(store.get("nope"), Err(RegistryError::not_found("nope")));
    }

    #[test]
    fn test_get_corrupt_is_decode() {
        let mut state = MapState::default();
        state.0.insert("bad".into(), b"not a record".to_vec());
        let store = RecordStore::new(&mut state);

        assert!(store.exists("bad").unwrap());
        assert!(matches!(store.get("bad"), Err(RegistryError::Decode(_))));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let mut state = MapState::default();
        let mut store = RecordStore::new(&mut state);

        assert_eq!(store.delete("h"), Err(RegistryError::not_found("h")));
        store.put("h", &CidRecord::new("h", "Qm1")).unwrap();
        store.delete("h").unwrap();
        assert!(!store.exists("h").unwrap());
    }

    #[test]
    fn test_scan_skips_corrupt_entries() {
        let mut state = MapState::default();
        state.0.insert("a".into(), CidRecord::new("a", "QmA").encode().unwrap());
        state.0.insert("b".into(), CidRecord::new("b", "QmB").encode().unwrap());
        state.0.insert("c".into(), b"\x00\x01corrupted".to_vec());
        let store = RecordStore::new(&mut state);

        let records: Vec<_> = store.scan_all().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(
            records,
            vec![CidRecord::new("a", "QmA"), CidRecord::new("b", "QmB")]
        );
    }

    #[test]
    fn test_ledger_failures_are_store_unavailable() {
        let mut state = DownState;
        let mut store = RecordStore::new(&mut state);

        assert!(matches!(
            store.exists("h"),
            Err(RegistryError::StoreUnavailable(_))
        ));
        assert!(matches!(
            store.put("h", &CidRecord::new("h", "c")),
            Err(RegistryError::StoreUnavailable(_))
        ));

        let mut scan = store.scan_all().unwrap();
        assert!(matches!(
            scan.next(),
            Some(Err(RegistryError::StoreUnavailable(_)))
        ));
        assert!(scan.next().is_none());
    }
}
