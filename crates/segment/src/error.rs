use std::io;
use thiserror::Error;

/// Errors surfaced by segment writers, readers and iterators.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The segment's on-disk structure is invalid: bad footer, short meta
    /// file, or a decode failure.
    #[error("invalid segment: {0}")]
    Format(String),

    /// A key required to be present in this segment's key index was not.
    #[error("key not found in segment")]
    KeyNotFound,

    /// A previous operation on this writer or reader failed; the handle
    /// refuses further work.
    #[error("segment handle poisoned by an earlier error")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, SegmentError>;
