//! # RocksDB State Backend
//!
//! Durable `StateBackend` for the registry ledger.
//!
//! - One key per bound hash, value is the stored record bytes
//! - Commits are a single `WriteBatch`, so a transaction lands whole or not at all
//! - Range scans stream straight off a RocksDB iterator in bytewise key
//!   order, which matches the UTF-8 ordering of the in-memory backend

use cid_registry::errors::LedgerError;
use cid_registry::ports::outbound::{StateBackend, StateIter, WriteSet};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// RocksDB configuration.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: PathBuf,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// fsync each commit (default: true)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/cid-registry"),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Config rooted at `path` with default tuning.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// RocksDB-backed committed state.
pub struct RocksDbBackend {
    db: DB,
    config: RocksDbConfig,
}

impl RocksDbBackend {
    /// Open or create the database.
    pub fn open(config: RocksDbConfig) -> Result<Self, LedgerError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path)
            .map_err(|e| LedgerError::Backend(format!("Failed to open RocksDB: {e}")))?;

        info!(path = %config.path.display(), "RocksDB state backend opened");
        Ok(Self { db, config })
    }

    /// Configuration the database was opened with.
    pub fn config(&self) -> &RocksDbConfig {
        &self.config
    }
}

impl StateBackend for RocksDbBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.db
            .get(key.as_bytes())
            .map_err(|e| LedgerError::Backend(format!("RocksDB get failed: {e}")))
    }

    fn scan(&self, start: &str, end: &str) -> Result<StateIter<'_>, LedgerError> {
        let mode = if start.is_empty() {
            IteratorMode::Start
        } else {
            IteratorMode::From(start.as_bytes(), Direction::Forward)
        };
        let end = end.as_bytes().to_vec();

        let entries = self
            .db
            .iterator(mode)
            .map(|item| item.map_err(|e| LedgerError::Backend(format!("RocksDB scan failed: {e}"))))
            .take_while(move |item| match item {
                Ok((key, _)) => end.is_empty() || &**key < end.as_slice(),
                Err(_) => true,
            })
            .filter_map(|item| match item {
                Ok((key, value)) => match String::from_utf8(key.into_vec()) {
                    Ok(key) => Some(Ok((key, value.into_vec()))),
                    Err(e) => {
                        warn!(error = %e, "Skipping non UTF-8 state key");
                        None
                    }
                },
                Err(e) => Some(Err(e)),
            });

        Ok(Box::new(entries))
    }

    fn apply(&self, writes: WriteSet) -> Result<(), LedgerError> {
        let mut batch = WriteBatch::default();
        for (key, value) in &writes {
            match value {
                Some(bytes) => batch.put(key.as_bytes(), bytes),
                None => batch.delete(key.as_bytes()),
            }
        }

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);

        self.db
            .write_opt(batch, &write_opts)
            .map_err(|e| LedgerError::Backend(format!("RocksDB batch write failed: {e}")))
    }
}
