//! Write path: `put()`, `delete()`, the flush to a new segment, and the WAL
//! rotation that follows it.

use memtable::{Record, Value};
use segment::SegmentWriter;
use wal::WalWriter;

use crate::{
    encode_value, Database, Error, Result, CURRENT_LOG, FLUSH_THRESHOLD, MEMDB_FILE, OLD_LOG,
};

impl Database {
    /// Saves a key/value pair.
    ///
    /// The record is appended to the WAL (fsynced when `sync_write` is
    /// set), the memtable is flushed to a fresh segment if it has reached
    /// [`FLUSH_THRESHOLD`], and the pair is inserted into the memtable.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if self.options.read_only {
            return Err(Error::ReadOnly);
        }
        if key.is_empty() {
            return Err(Error::KeyRequired);
        }
        if value.is_empty() {
            return Err(Error::ValueRequired);
        }
        self.put_value(key, Value::Data(value.to_vec()))
    }

    /// Deletes the value associated with a key by writing a tombstone.
    ///
    /// The key must currently resolve, otherwise [`Error::DeleteFailed`] is
    /// returned. A deleted key is resurrected by a later [`put`].
    ///
    /// [`put`]: Database::put
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if self.options.read_only {
            return Err(Error::ReadOnly);
        }
        if key.is_empty() {
            return Err(Error::KeyRequired);
        }
        match self.get(key) {
            Ok(_) => {}
            Err(Error::KeyNotFound) => return Err(Error::DeleteFailed),
            Err(e) => return Err(e),
        }
        self.put_value(key, Value::Tombstone)
    }

    fn put_value(&mut self, key: &[u8], value: Value) -> Result<()> {
        let wal = self.wal.as_mut().ok_or(Error::Closed)?;
        wal.append(key, encode_value(&value))?;
        if self.options.sync_write {
            wal.sync()?;
        }

        // Pre-insert check: the record that trips the threshold lands in
        // the fresh memtable, covered by the fresh WAL.
        if self.memdb.size() >= FLUSH_THRESHOLD {
            self.flush()?;
        }

        self.memdb.insert(Record {
            key: key.to_vec(),
            value,
        });
        Ok(())
    }

    /// Freezes the current memtable into a new segment triple, then rotates
    /// the WAL and removes any stale snapshot. The memtable is replaced
    /// only after the segment is fully written, so a failure mid-flush
    /// leaves everything recoverable from the old WAL.
    fn flush(&mut self) -> Result<()> {
        for (key, _) in self.memdb.in_order() {
            self.filter.add(key);
        }

        let seg = self.fs.new_segment()?;
        let id = seg.id.clone();
        let mut writer = SegmentWriter::new(seg, self.options.use_compression);
        self.filter.write_to(writer.filter_file())?;
        for (key, value) in self.memdb.in_order() {
            writer.set(key, encode_value(value))?;
        }
        writer.close()?;
        self.filter.reset();

        self.rotate_log()?;
        self.fs.delete_file(MEMDB_FILE)?;

        tracing::info!(
            segment = %id,
            keys = self.memdb.len(),
            "flushed memtable to segment"
        );
        self.memdb = memtable::Memtable::new();
        Ok(())
    }

    /// Renames the active log aside, deletes it, and opens a fresh one.
    fn rotate_log(&mut self) -> Result<()> {
        self.wal = None;
        self.fs.rename_file(CURRENT_LOG, OLD_LOG)?;
        self.fs.delete_file(OLD_LOG)?;
        self.wal = Some(WalWriter::open(self.fs.file_path(CURRENT_LOG))?);
        Ok(())
    }
}
