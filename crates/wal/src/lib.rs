//! # WAL — Write-Ahead Log
//!
//! Durability for the StrataKV write path. Every mutation is appended here
//! **before** the in-memory table is touched, so on restart a replay of the
//! log reconstructs everything the memtable held since the last flush. The
//! log is rotated (renamed, deleted, recreated) by the engine immediately
//! after a successful segment flush.
//!
//! ## Record Format
//!
//! ```text
//! key ':' value ';'
//! ```
//!
//! No framing and no checksums — records are delimited by the trailing `;`
//! and split at the first `:`. A trailing record without its terminator
//! (crash mid-append) is treated as a clean end of log; all complete records
//! before it are still replayed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wal::{WalReader, WalWriter};
//!
//! let mut w = WalWriter::open("writeahead.log").unwrap();
//! w.append(b"hello", b"world").unwrap();
//! drop(w);
//!
//! let mut r = WalReader::open("writeahead.log").unwrap();
//! r.replay(|key, value| println!("{:?} -> {:?}", key, value)).unwrap();
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Separator between a record's key and value.
const SEPARATOR: u8 = b':';
/// Terminator closing a record.
const TERMINATOR: u8 = b';';

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A complete record carried no key/value separator.
    #[error("corrupt record")]
    Corrupt,
}

/// Append-only WAL writer.
///
/// Each record is assembled in a reusable scratch buffer and handed to the
/// file in a single `write_all`. Durability beyond the OS cache is the
/// caller's choice via [`sync`](WalWriter::sync) (the engine calls it when
/// `sync_write` is configured).
pub struct WalWriter {
    file: File,
    buf: Vec<u8>,
}

impl WalWriter {
    /// Opens (or creates) a WAL file in append mode.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            file,
            buf: Vec::with_capacity(256),
        })
    }

    /// Appends one `key:value;` record.
    pub fn append(&mut self, key: &[u8], value: &[u8]) -> Result<(), WalError> {
        self.buf.clear();
        self.buf.reserve(key.len() + value.len() + 2);
        self.buf.extend_from_slice(key);
        self.buf.push(SEPARATOR);
        self.buf.extend_from_slice(value);
        self.buf.push(TERMINATOR);

        self.file.write_all(&self.buf)?;
        Ok(())
    }

    /// Forces appended records to disk via `fsync`.
    pub fn sync(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

/// Sequential reader over a WAL file, yielding complete records in append
/// order.
#[derive(Debug)]
pub struct WalReader {
    data: Vec<u8>,
}

impl WalReader {
    /// Opens an existing WAL file for replay. The whole log is pulled into
    /// memory — it never outgrows one flush interval.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WalError> {
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        Ok(Self { data })
    }

    /// Constructs a reader over an in-memory buffer (used by tests).
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Replays every complete record, calling `apply(key, value)` for each.
    ///
    /// # Termination
    ///
    /// - End of log -> `Ok(())`.
    /// - Trailing bytes without a terminator (crash mid-append) -> `Ok(())`
    ///   after yielding the complete records before them.
    /// - A complete record without a `:` separator -> `Err(WalError::Corrupt)`.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<(), WalError>
    where
        F: FnMut(&[u8], &[u8]),
    {
        let mut rest = self.data.as_slice();
        while let Some(end) = rest.iter().position(|&b| b == TERMINATOR) {
            let record = &rest[..end];
            rest = &rest[end + 1..];

            let sep = record
                .iter()
                .position(|&b| b == SEPARATOR)
                .ok_or(WalError::Corrupt)?;
            apply(&record[..sep], &record[sep + 1..]);
        }
        // Anything left over is a truncated tail.
        Ok(())
    }
}
