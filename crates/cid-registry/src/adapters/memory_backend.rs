//! In-memory state backend.

use crate::errors::LedgerError;
use crate::ports::outbound::{in_range, StateBackend, StateEntry, StateIter, WriteSet};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Committed state held in a sorted map.
///
/// Key order is byte order of the UTF-8 keys, matching what a range scan
/// over a real ledger returns. `set_offline` makes every call fail, for
/// exercising `StoreUnavailable` paths.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
    offline: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes directly, bypassing transactions.
    ///
    /// Seeds legacy or corrupted entries.
    pub fn insert_raw(
        &self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Result<(), LedgerError> {
        self.data
            .write()
            .map_err(|_| LedgerError::LockPoisoned)?
            .insert(key.into(), value.into());
        Ok(())
    }

    /// Simulate the peer becoming unreachable, or recovering.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of committed keys.
    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.data.read().map_err(|_| LedgerError::LockPoisoned)?.len())
    }

    /// True if nothing is committed.
    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }

    fn check_online(&self) -> Result<(), LedgerError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LedgerError::Backend("state backend offline".to_string()));
        }
        Ok(())
    }
}

impl StateBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.check_online()?;
        let data = self.data.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(data.get(key).cloned())
    }

    fn scan(&self, start: &str, end: &str) -> Result<StateIter<'_>, LedgerError> {
        self.check_online()?;
        let data = self.data.read().map_err(|_| LedgerError::LockPoisoned)?;
        // Copied out so the read lock is not held while the caller iterates
        let range: Vec<StateEntry> = data
            .iter()
            .filter(|(k, _)| in_range(k, start, end))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Box::new(range.into_iter().map(Ok)))
    }

    fn apply(&self, writes: WriteSet) -> Result<(), LedgerError> {
        self.check_online()?;
        let mut data = self.data.write().map_err(|_| LedgerError::LockPoisoned)?;
        for (key, value) in writes {
            match value {
                Some(bytes) => {
                    data.insert(key, bytes);
                }
                None => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_puts_and_deletes() {
        let backend = MemoryBackend::new();
        backend.insert_raw("gone", b"x".to_vec()).unwrap();

        let mut writes = WriteSet::new();
        writes.insert("a".into(), Some(b"1".to_vec()));
        writes.insert("gone".into(), None);
        backend.apply(writes).unwrap();

        assert_eq!(backend.read("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(backend.read("gone").unwrap(), None);
        assert_eq!(backend.len().unwrap(), 1);
    }

    #[test]
    fn test_scan_is_key_ordered() {
        let backend = MemoryBackend::new();
        for key in ["c", "a", "b"] {
            backend.insert_raw(key, key.as_bytes().to_vec()).unwrap();
        }

        let keys: Vec<_> = backend
            .scan("", "")
            .unwrap()
            .map(|entry| entry.unwrap().0)
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);

        assert_eq!(backend.scan("b", "c").unwrap().count(), 1);
    }

    #[test]
    fn test_offline_fails_everything() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);

        assert!(backend.read("a").is_err());
        assert!(backend.scan("", "").is_err());
        assert!(backend.apply(WriteSet::new()).is_err());

        backend.set_offline(false);
        assert!(backend.read("a").is_ok());
    }
}
