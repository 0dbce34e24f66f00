//! Error types for the StrataKV engine.
//!
//! Validation and state errors are sentinel variants callers test with
//! `matches!`; I/O, format and collaborator failures arrive wrapped with
//! the failing subsystem attached.

use segment::SegmentError;
use std::io;
use thiserror::Error;
use wal::WalError;

/// Result type alias using the engine [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The database directory path was empty.
    #[error("path cannot be empty")]
    PathRequired,

    /// A key was empty or missing.
    #[error("key cannot be empty")]
    KeyRequired,

    /// A value was empty or missing.
    #[error("value cannot be empty")]
    ValueRequired,

    /// A write was attempted on a database opened read-only.
    #[error("database is readonly")]
    ReadOnly,

    /// The database is not open.
    #[error("database not open")]
    Closed,

    /// The key does not exist in the database.
    #[error("key not found")]
    KeyNotFound,

    /// A delete was requested for a key that does not resolve.
    #[error("failed to delete key")]
    DeleteFailed,

    /// The range's end key sorts before its start key.
    #[error("end key must not be less than start key")]
    InvalidRange,

    /// The range's start and end keys live in different segments.
    #[error("start and end keys must reside in the same segment")]
    RangeError,

    /// A lock could not be acquired within the timeout.
    #[error("operation timed out")]
    Timeout,

    /// A file required by the operation does not exist.
    #[error("file does not exist")]
    FileDoesNotExist,

    /// The operation's target file already exists.
    #[error("file already exists")]
    FileAlreadyExists,

    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A segment-level failure (format, poisoning, segment I/O).
    #[error("segment error: {0}")]
    Segment(#[from] SegmentError),

    /// A write-ahead-log failure.
    #[error("write-ahead log error: {0}")]
    Wal(#[from] WalError),

    /// The memtable snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}
