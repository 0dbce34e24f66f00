//! Produces one segment: data blocks, meta file, and the running key index.

use std::fs::File;
use std::io::{BufWriter, Write};

use crate::format::{
    encode_block_info, encode_footer, put_uvarint, BlockInfo, KeyIndexEntry, BLOCK_SIZE,
};
use crate::{Result, Segment, SegmentError};

/// Writes the data and meta files of a fresh segment.
///
/// Records must arrive in ascending key order (they come from an in-order
/// memtable traversal or a merging iterator, both sorted). `set` encodes
/// each record into the pending block buffer and cuts a block whenever the
/// buffer reaches [`BLOCK_SIZE`]; `close` flushes the final block and lays
/// down the meta file.
///
/// The first error poisons the writer: every later call returns
/// [`SegmentError::Poisoned`]. Value bytes are never retained beyond the
/// current block buffer; keys are retained in the key index until `close`.
pub struct SegmentWriter {
    id: String,
    data: BufWriter<File>,
    meta: BufWriter<File>,
    filter: File,
    buf: Vec<u8>,
    key_index: Vec<KeyIndexEntry>,
    blocks: Vec<BlockInfo>,
    /// Bytes written to the data file so far.
    offset: u64,
    /// Running total of raw key+value bytes (length prefixes excluded).
    key_offset: u64,
    /// Records in the pending block buffer.
    entries_in_block: usize,
    /// Latent hook: when set, block bytes would be compressed in
    /// `finish_block` and `BlockInfo.length` would record the compressed
    /// size. No current code path compresses.
    #[allow(dead_code)]
    compress: bool,
    poisoned: bool,
    closed: bool,
}

impl SegmentWriter {
    #[must_use]
    pub fn new(segment: Segment, compress: bool) -> Self {
        let Segment {
            id,
            data,
            meta,
            filter,
        } = segment;
        Self {
            id,
            data: BufWriter::new(data),
            meta: BufWriter::new(meta),
            filter,
            buf: Vec::with_capacity(BLOCK_SIZE * 2),
            key_index: Vec::new(),
            blocks: Vec::new(),
            offset: 0,
            key_offset: 0,
            entries_in_block: 0,
            compress,
            poisoned: false,
            closed: false,
        }
    }

    /// The segment's timestamp id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The filter file of the segment under construction. The engine
    /// serializes the Bloom filter through this handle.
    pub fn filter_file(&mut self) -> &mut File {
        &mut self.filter
    }

    /// Appends one record.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if self.poisoned {
            return Err(SegmentError::Poisoned);
        }
        if self.closed {
            return Err(SegmentError::Format("writer already closed".into()));
        }

        self.key_index.push(KeyIndexEntry {
            key: key.to_vec(),
            key_offset: self.key_offset,
        });
        self.key_offset += (key.len() + value.len()) as u64;

        put_uvarint(&mut self.buf, key.len() as u64);
        put_uvarint(&mut self.buf, value.len() as u64);
        self.buf.extend_from_slice(key);
        self.buf.extend_from_slice(value);
        self.entries_in_block += 1;

        if self.buf.len() >= BLOCK_SIZE {
            if let Err(e) = self.finish_block() {
                self.poisoned = true;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Flushes the final block, writes the meta file (key index, block
    /// info, footer) and flushes both files. The file handles close when
    /// the writer is dropped.
    pub fn close(&mut self) -> Result<()> {
        if self.poisoned {
            return Err(SegmentError::Poisoned);
        }
        if self.closed {
            return Ok(());
        }
        if let Err(e) = self.try_close() {
            self.poisoned = true;
            return Err(e);
        }
        self.closed = true;
        Ok(())
    }

    fn try_close(&mut self) -> Result<()> {
        // A trailing partial block, or a single empty block for a segment
        // that never saw a record.
        if self.entries_in_block > 0 || self.key_index.is_empty() {
            self.finish_block()?;
        }

        let encoded = bincode::serialize(&self.key_index)
            .map_err(|e| SegmentError::Format(format!("key index encode: {}", e)))?;
        self.meta.write_all(&encoded)?;
        let n = encoded.len() as u64;

        let mut tail = Vec::with_capacity(self.blocks.len() * 4);
        for bi in &self.blocks {
            encode_block_info(&mut tail, *bi);
        }
        self.meta.write_all(&tail)?;

        let footer = encode_footer(n)
            .ok_or_else(|| SegmentError::Format("key index too large for footer".into()))?;
        self.meta.write_all(&footer)?;

        self.data.flush()?;
        self.meta.flush()?;
        Ok(())
    }

    fn finish_block(&mut self) -> Result<()> {
        self.data.write_all(&self.buf)?;
        self.blocks.push(BlockInfo {
            start: self.offset,
            length: self.buf.len() as u64,
        });
        self.offset += self.buf.len() as u64;
        self.buf.clear();
        self.entries_in_block = 0;
        Ok(())
    }
}
