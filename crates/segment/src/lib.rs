//! # Segment — Immutable On-Disk Sorted Tables
//!
//! A segment is the on-disk level of the StrataKV LSM tree: one immutable
//! triple of files sharing a timestamp id and differing only in extension.
//! Segments are *write-once, read-many* — produced by a memtable flush or a
//! compaction pass, then only ever read until a successor replaces them.
//!
//! ## File layout
//!
//! ```text
//! <id>.data                       <id>.meta
//! ┌──────────────────────────┐    ┌─────────────────────────────────┐
//! │ BLOCK 0                  │    │ KEY INDEX (bincode)             │
//! │  uvarint(key_len)        │    │   [{ key, key_offset }, ...]    │
//! │  uvarint(val_len)        │    │   (o bytes)                     │
//! │  key bytes               │    ├─────────────────────────────────┤
//! │  value bytes             │    │ BLOCK INFO                      │
//! │  ... repeated ...        │    │   uvarint(start) uvarint(len)   │
//! ├──────────────────────────┤    │   ... one pair per block ...    │
//! │ BLOCK 1                  │    ├─────────────────────────────────┤
//! │  ...                     │    │ FOOTER (4 bytes)                │
//! └──────────────────────────┘    │   uvarint(o), zero padded       │
//!                                 └─────────────────────────────────┘
//! <id>.filter — serialized scalable Bloom filter over the segment's keys
//! ```
//!
//! A block is cut when the pending buffer reaches [`format::BLOCK_SIZE`]
//! bytes; blocks are not padded and block boundaries do not appear in the
//! data file itself. `key_offset` is the *logical* offset of a record's
//! payload — the running total of raw key+value bytes, excluding the length
//! prefixes. The reader reconstructs physical offsets exactly from the key
//! index (see [`SegmentReader`]).

mod cursor;
mod error;
pub mod format;
mod iterator;
mod merge;
mod reader;
mod writer;

pub use cursor::Cursor;
pub use error::{Result, SegmentError};
pub use iterator::ChunkIterator;
pub use merge::MergingIterator;
pub use reader::SegmentReader;
pub use writer::SegmentWriter;

use std::fs::File;

/// One segment's open file handles plus its identifying timestamp id.
///
/// The triple is produced by the engine's filesystem manager and consumed by
/// either a [`SegmentWriter`] (fresh segment) or a [`SegmentReader`]
/// (existing segment), which then own the handles until closed.
pub struct Segment {
    pub id: String,
    pub data: File,
    pub meta: File,
    pub filter: File,
}

impl Segment {
    #[must_use]
    pub fn new(id: String, data: File, meta: File, filter: File) -> Self {
        Self {
            id,
            data,
            meta,
            filter,
        }
    }
}

#[cfg(test)]
mod tests;
