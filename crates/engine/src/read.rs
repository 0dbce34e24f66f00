//! Read path: `get()` and `range()`.
//!
//! Point lookups consult the memtable first, then segments newest-first.
//! Each segment's Bloom filter is loaded read-only from its filter file and
//! gates the actual segment read; the first segment that really contains
//! the key decides the outcome (a tombstone there shadows older segments).

use bloom::ScalableBloomFilter;
use memtable::Value;
use segment::{Cursor, SegmentReader};

use crate::{Database, Error, Result, TOMBSTONE};

impl Database {
    /// Returns the latest value for `key`, or [`Error::KeyNotFound`].
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.ensure_open()?;
        if key.is_empty() {
            return Err(Error::KeyRequired);
        }

        if let Some(value) = self.memdb.get(key) {
            return match value {
                Value::Tombstone => Err(Error::KeyNotFound),
                Value::Data(bytes) => Ok(bytes.clone()),
            };
        }

        for id in self.segment_ids_newest_first()? {
            let seg = self.fs.open_segment(&id)?;
            let filter = ScalableBloomFilter::read_from(&mut (&seg.filter))?;
            if !filter.test(key) {
                continue;
            }
            let mut reader = SegmentReader::open(seg, self.options.use_compression)?;
            match reader.get(key)? {
                Some(value) if value == TOMBSTONE => return Err(Error::KeyNotFound),
                Some(value) => return Ok(value),
                // Filter false positive; keep scanning older segments.
                None => continue,
            }
        }
        Err(Error::KeyNotFound)
    }

    /// Returns a cursor over `[start, end]`, both bounds inclusive.
    ///
    /// Both keys must resolve to the **same** segment: a missing key yields
    /// [`Error::KeyNotFound`], keys in different segments yield
    /// [`Error::RangeError`], and `start > end` yields
    /// [`Error::InvalidRange`].
    pub fn range(&self, start: &[u8], end: &[u8]) -> Result<Cursor> {
        self.ensure_open()?;
        if start.is_empty() || end.is_empty() {
            return Err(Error::KeyRequired);
        }
        if start > end {
            return Err(Error::InvalidRange);
        }

        let (id1, mut reader) = self.segment_with_key(start)?;
        let (id2, _) = self.segment_with_key(end)?;
        if id1 != id2 {
            return Err(Error::RangeError);
        }
        Ok(reader.range(start, end)?)
    }

    /// Newest segment whose filter passes and whose key index actually
    /// contains `key`.
    fn segment_with_key(&self, key: &[u8]) -> Result<(String, SegmentReader)> {
        for id in self.segment_ids_newest_first()? {
            let seg = self.fs.open_segment(&id)?;
            let filter = ScalableBloomFilter::read_from(&mut (&seg.filter))?;
            if !filter.test(key) {
                continue;
            }
            let reader = SegmentReader::open(seg, self.options.use_compression)?;
            if reader.contains(key) {
                return Ok((id, reader));
            }
        }
        Err(Error::KeyNotFound)
    }

    /// Segment ids newest first (ids sort lexicographically by creation
    /// time).
    pub(crate) fn segment_ids_newest_first(&self) -> Result<Vec<String>> {
        let mut ids = self.fs.data_file_ids()?;
        ids.reverse();
        Ok(ids)
    }
}
