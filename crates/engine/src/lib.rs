//! # Engine — the StrataKV database facade
//!
//! Glues the [`memtable`], [`wal`], [`segment`] and [`bloom`] crates into a
//! persistent ordered key-value store following the LSM discipline.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────────┐
//! │                    DATABASE                       │
//! │                                                   │
//! │ write.rs → WAL append → memtable insert           │
//! │               |                                   │
//! │               |  (size >= FLUSH_THRESHOLD?)       │
//! │               |            yes                    │
//! │               v                                   │
//! │            flush() → segment triple               │
//! │                      (.data/.meta/.filter)        │
//! │                      + WAL rotation               │
//! │                                                   │
//! │ read.rs → memtable → segments newest-first        │
//! │            (per-segment Bloom filter gates        │
//! │             each segment read)                    │
//! │                                                   │
//! │ compaction.rs → bucketed merge of segments,       │
//! │                 run against a quiesced directory  │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module         | Purpose                                           |
//! |----------------|---------------------------------------------------|
//! | `lib.rs`       | `Database` struct, open/close, recovery, accessors |
//! | `write.rs`     | `put()`, `delete()`, flush, WAL rotation          |
//! | `read.rs`      | `get()`, `range()`                                |
//! | `filesystem.rs`| directory layout, locking, segment file triples   |
//! | `snapshot.rs`  | memtable persistence across clean shutdowns       |
//! | `compaction.rs`| bucketed segment merging                          |
//!
//! ## Durability
//!
//! Every write is appended to the WAL **before** the memtable insert. The
//! WAL is rotated only after a successful flush, and the close-time
//! memtable snapshot is absorbed (and removed) on the next open, with WAL
//! replay covering every other shutdown path.

mod compaction;
mod error;
mod filesystem;
mod options;
mod read;
mod snapshot;
mod write;

pub use compaction::{BucketState, BucketStats, Compactor, MAX_BUCKET, MIN_BUCKET};
pub use error::{Error, Result};
pub use filesystem::FsManager;
pub use options::Options;
pub use segment::Cursor;

use bloom::ScalableBloomFilter;
use memtable::{Memtable, Record, Value};
use std::path::{Path, PathBuf};
use wal::WalWriter;

/// Number of inserts the memtable absorbs before it is frozen and flushed
/// to a segment.
pub const FLUSH_THRESHOLD: usize = 1 << 16;

/// On-disk marker for a logically deleted key. Never exposed to clients.
pub const TOMBSTONE: &[u8] = b"tombstone/0";

/// Name of the active write-ahead log.
pub const CURRENT_LOG: &str = "writeahead.log";

/// Transient name the log takes during rotation.
pub const OLD_LOG: &str = "writeahead_old.log";

/// Name of the persisted memtable snapshot.
pub const MEMDB_FILE: &str = "memfs.gob";

/// False-positive target of the per-segment Bloom filters built on flush.
const FILTER_FP_RATE: f64 = 0.0001;

/// A persistent ordered key-value store.
///
/// Mutating operations take `&mut self` — the borrow checker is the
/// process-wide write lock — while cross-process exclusion comes from the
/// advisory file lock held for the lifetime of the handle.
pub struct Database {
    fs: FsManager,
    options: Options,
    memdb: Memtable,
    /// Write-path filter, populated from C0 at flush time and reset after
    /// the segment's filter file is written. The read path loads each
    /// segment's filter read-only instead of sharing this one.
    filter: ScalableBloomFilter,
    /// `None` once the database is closed.
    wal: Option<WalWriter>,
    open: bool,
}

impl Database {
    /// Opens (creating if necessary) the database at `dir`.
    ///
    /// Recovery order: a readable `memfs.gob` snapshot is absorbed and
    /// deleted; otherwise the write-ahead log is replayed into a fresh
    /// memtable. Either way the WAL is then opened for appending.
    ///
    /// # Errors
    ///
    /// [`Error::PathRequired`] for an empty path, [`Error::Timeout`] when
    /// another process holds the directory lock, plus any I/O failure.
    pub fn open<P: AsRef<Path>>(dir: P, options: Options) -> Result<Database> {
        if dir.as_ref().as_os_str().is_empty() {
            return Err(Error::PathRequired);
        }
        let dir: PathBuf = dir.as_ref().components().collect();

        let mut fs = FsManager::new(dir, options.read_only);
        fs.open_db()?;

        // A leftover rotation file means a flush was interrupted after its
        // segment was written; the records in it are already persisted.
        if !options.read_only {
            fs.delete_file(OLD_LOG)?;
        }

        let mut memdb = Memtable::new();
        match snapshot::load(&fs.file_path(MEMDB_FILE)) {
            Ok(Some(records)) => {
                memdb = Memtable::from_records(records);
                // The WAL, rotated only at flush, still covers the snapshot's
                // content, so consuming the file loses nothing on a crash.
                if !options.read_only {
                    fs.delete_file(MEMDB_FILE)?;
                }
                tracing::debug!(entries = memdb.len(), "restored memtable snapshot");
            }
            Ok(None) => replay_log(&fs, &mut memdb)?,
            Err(e) => {
                tracing::warn!(error = %e, "snapshot unreadable, replaying write-ahead log");
                replay_log(&fs, &mut memdb)?;
            }
        }

        let wal = WalWriter::open(fs.file_path(CURRENT_LOG))?;

        Ok(Database {
            fs,
            options,
            memdb,
            filter: ScalableBloomFilter::new(FILTER_FP_RATE),
            wal: Some(wal),
            open: true,
        })
    }

    /// Persists the memtable snapshot, closes the WAL and releases the
    /// directory lock. Every later operation fails with [`Error::Closed`].
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        snapshot::persist(&self.fs.file_path(MEMDB_FILE), &self.memdb)?;
        self.wal = None;
        self.fs.close()?;
        self.open = false;
        Ok(())
    }

    /// The database directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.fs.path()
    }

    /// Distinct keys currently held in the memtable.
    #[must_use]
    pub fn memtable_len(&self) -> usize {
        self.memdb.len()
    }

    /// Inserts absorbed by the memtable since its creation.
    #[must_use]
    pub fn memtable_size(&self) -> usize {
        self.memdb.size()
    }

    /// Number of segments currently on disk.
    pub fn segment_count(&self) -> Result<usize> {
        Ok(self.fs.data_file_ids()?.len())
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.fs.path())
            .field("open", &self.open)
            .field("read_only", &self.options.read_only)
            .field("sync_write", &self.options.sync_write)
            .field("memtable_len", &self.memdb.len())
            .field("memtable_size", &self.memdb.size())
            .finish()
    }
}

fn replay_log(fs: &FsManager, memdb: &mut Memtable) -> Result<()> {
    let path = fs.file_path(CURRENT_LOG);
    if !path.exists() {
        return Ok(());
    }
    let mut reader = wal::WalReader::open(&path)?;
    let mut replayed = 0usize;
    reader.replay(|key, value| {
        memdb.insert(Record {
            key: key.to_vec(),
            value: decode_value(value),
        });
        replayed += 1;
    })?;
    if replayed > 0 {
        tracing::info!(records = replayed, "replayed write-ahead log");
    }
    Ok(())
}

/// Maps on-disk value bytes to the in-memory representation.
pub(crate) fn decode_value(bytes: &[u8]) -> Value {
    if bytes == TOMBSTONE {
        Value::Tombstone
    } else {
        Value::Data(bytes.to_vec())
    }
}

/// Maps an in-memory value to its on-disk bytes.
pub(crate) fn encode_value(value: &Value) -> &[u8] {
    match value {
        Value::Data(bytes) => bytes,
        Value::Tombstone => TOMBSTONE,
    }
}

#[cfg(test)]
mod tests;
