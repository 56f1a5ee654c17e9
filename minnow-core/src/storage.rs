//! Event journal using RocksDB
//!
//! # Column Families
//!
//! - `events` - Append-only journal of accepted transitions
//!   (key: big-endian sequence number, value: bincode `PondEvent`)
//! - `meta` - Parameters the journal was written under
//!   (`close_threshold`: big-endian u128 base units)
//!
//! State is never stored directly; `Pond::open` replays the journal.

use crate::{
    error::{Error, Result},
    types::{Amount, PondEvent},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteOptions, DB};
use std::sync::Arc;

/// Column family names
const CF_EVENTS: &str = "events";
const CF_META: &str = "meta";

/// Metadata keys
const KEY_CLOSE_THRESHOLD: &[u8] = b"close_threshold";

/// Journal storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
    sync_writes: bool,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.db.path())
            .field("sync_writes", &self.sync_writes)
            .finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;
        let rocks = &config.persistence.rocksdb;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(rocks.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(rocks.max_background_jobs);
        if rocks.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_EVENTS, Self::cf_options_events()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB journal");

        Ok(Self {
            db: Arc::new(db),
            sync_writes: config.persistence.sync_writes,
        })
    }

    fn cf_options_events() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    /// Append one event at `sequence`
    pub fn append_event(&self, sequence: u64, event: &PondEvent) -> Result<()> {
        let cf = self.cf_handle(CF_EVENTS)?;
        let value = bincode::serialize(event)?;

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.sync_writes);
        self.db
            .put_cf_opt(cf, sequence.to_be_bytes(), &value, &write_opts)?;

        tracing::debug!(sequence, "Event journaled");
        Ok(())
    }

    /// All events in journal order
    pub fn load_events(&self) -> Result<Vec<PondEvent>> {
        let cf = self.cf_handle(CF_EVENTS)?;

        let mut events: Vec<PondEvent> = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let sequence = <[u8; 8]>::try_from(&key[..])
                .map(u64::from_be_bytes)
                .map_err(|_| Error::Storage(format!("Malformed journal key {:?}", key)))?;
            if sequence != events.len() as u64 {
                return Err(Error::Storage(format!(
                    "Journal gap: expected sequence {}, found {}",
                    events.len(),
                    sequence
                )));
            }
            events.push(bincode::deserialize(&value)?);
        }

        Ok(events)
    }

    /// Closing threshold the journal was written under, if recorded
    pub fn load_threshold(&self) -> Result<Option<Amount>> {
        let cf = self.cf_handle(CF_META)?;
        match self.db.get_cf(cf, KEY_CLOSE_THRESHOLD)? {
            Some(value) => <[u8; 16]>::try_from(&value[..])
                .map(|bytes| Some(Amount::from_be_bytes(bytes)))
                .map_err(|_| Error::Storage(format!("Malformed close_threshold {:?}", value))),
            None => Ok(None),
        }
    }

    /// Record the closing threshold the journal is written under
    pub fn store_threshold(&self, threshold: Amount) -> Result<()> {
        let cf = self.cf_handle(CF_META)?;

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.sync_writes);
        self.db
            .put_cf_opt(cf, KEY_CLOSE_THRESHOLD, threshold.to_be_bytes(), &write_opts)?;
        Ok(())
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}
