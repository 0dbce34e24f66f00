//! # Memtable — the C0 component
//!
//! The in-memory level of the LSM tree: a sorted mapping from binary keys to
//! values with ordered traversal. Every mutation lands here (after the WAL
//! append) until the table reaches the flush threshold and is written out as
//! an immutable on-disk segment.
//!
//! Backed by a `BTreeMap`; any balanced ordered structure satisfies the
//! contract, the standard B-tree is simply the local choice.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored value: either client bytes or a tombstone marking a logical
/// delete. Tombstones shadow older values in segments and are never handed
/// to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Data(Vec<u8>),
    Tombstone,
}

impl Value {
    /// Returns the payload bytes, or `None` for a tombstone.
    #[must_use]
    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Value::Data(bytes) => Some(bytes),
            Value::Tombstone => None,
        }
    }

    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Value::Tombstone)
    }
}

/// One key/value pair as it moves through the write path and the snapshot
/// file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Value,
}

/// The C0 ordered in-memory table.
///
/// `size()` counts *inserts*, not distinct keys: an overwrite of an existing
/// key and a tombstone insert each move the table one step closer to the
/// flush threshold, mirroring the volume of work sitting in the WAL.
#[derive(Debug, Default)]
pub struct Memtable {
    map: BTreeMap<Vec<u8>, Value>,
    inserts: usize,
}

impl Memtable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, replacing any previous value for the key.
    pub fn insert(&mut self, record: Record) {
        self.map.insert(record.key, record.value);
        self.inserts += 1;
    }

    /// Looks up the current value for a key. A tombstone is returned as-is;
    /// interpreting it is the caller's job.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.map.get(key)
    }

    /// Ascending in-order traversal over `(key, value)` pairs.
    pub fn in_order(&self) -> impl Iterator<Item = (&[u8], &Value)> {
        self.map.iter().map(|(k, v)| (k.as_slice(), v))
    }

    /// Number of inserts since creation (not distinct keys).
    #[must_use]
    pub fn size(&self) -> usize {
        self.inserts
    }

    /// Number of distinct keys currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Materializes the table as a sorted record array, the form the
    /// snapshot file persists.
    #[must_use]
    pub fn to_records(&self) -> Vec<Record> {
        self.map
            .iter()
            .map(|(k, v)| Record {
                key: k.clone(),
                value: v.clone(),
            })
            .collect()
    }

    /// Rebuilds a table from a persisted record array. The insert counter
    /// restarts at the number of distinct records.
    #[must_use]
    pub fn from_records(records: Vec<Record>) -> Self {
        let map: BTreeMap<_, _> = records.into_iter().map(|r| (r.key, r.value)).collect();
        let inserts = map.len();
        Self { map, inserts }
    }
}
