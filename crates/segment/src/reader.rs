//! Point and range access to one segment via its key index and a read-only
//! memory mapping of the data file.

use memmap2::Mmap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use crate::format::{
    decode_block_info, decode_footer, uvarint_len, BlockInfo, KeyIndexEntry, FOOTER_BYTES,
};
use crate::{ChunkIterator, Cursor, Result, Segment, SegmentError};

/// Reads an existing segment.
///
/// On open the meta file is consumed back to front: the 4-byte footer gives
/// the byte length `o` of the key-index section, the block-info tail spans
/// `[o, meta_size - 4)`, and the key index itself spans `[0, o)`. The data
/// file is mapped read-only and never copied for point lookups.
///
/// ## Physical positions
///
/// `key_offset` in the index is logical — it excludes each record's two
/// varint length prefixes. The exact prefix sizes are recomputed from the
/// index itself: `len(value_i)` falls out of consecutive offsets and
/// `len(key_i)` is right there in the entry, so the physical start of
/// record `i` is `key_offset_i` plus the summed header lengths of all
/// earlier records. This holds for records of any size, including those
/// whose lengths need multi-byte varints.
pub struct SegmentReader {
    // Dropped before the file handles below.
    mmap: Option<Mmap>,
    id: String,
    #[allow(dead_code)]
    data: File,
    #[allow(dead_code)]
    filter: File,
    key_index: Vec<KeyIndexEntry>,
    blocks: Vec<BlockInfo>,
    /// Physical start of each record in the data file.
    positions: Vec<u64>,
    /// Latent hook mirroring the writer's: blocks would be decompressed
    /// after the mmap read. No current code path compresses.
    #[allow(dead_code)]
    compress: bool,
    poisoned: bool,
}

impl SegmentReader {
    /// Opens a segment and loads its meta file into memory.
    ///
    /// # Errors
    ///
    /// [`SegmentError::Format`] on a short meta file, bad footer, key-index
    /// decode failure or inconsistent offsets; [`SegmentError::Io`] on any
    /// I/O failure.
    pub fn open(segment: Segment, compress: bool) -> Result<Self> {
        let Segment {
            id,
            data,
            mut meta,
            filter,
        } = segment;

        let meta_size = meta.metadata()?.len();
        if meta_size < FOOTER_BYTES {
            return Err(SegmentError::Format("meta file too small".into()));
        }

        meta.seek(SeekFrom::End(-(FOOTER_BYTES as i64)))?;
        let mut footer = [0u8; FOOTER_BYTES as usize];
        meta.read_exact(&mut footer)?;
        let o = decode_footer(&footer).ok_or_else(|| SegmentError::Format("bad footer".into()))?;
        if o == 0 || o > meta_size - FOOTER_BYTES {
            return Err(SegmentError::Format(format!(
                "footer offset {} out of range for meta file of {} bytes",
                o, meta_size
            )));
        }

        meta.seek(SeekFrom::Start(0))?;
        let mut body = vec![0u8; (meta_size - FOOTER_BYTES) as usize];
        meta.read_exact(&mut body)?;

        let key_index: Vec<KeyIndexEntry> = bincode::deserialize(&body[..o as usize])
            .map_err(|e| SegmentError::Format(format!("key index decode: {}", e)))?;

        // Block-info tail: varint pairs until a zero-length sentinel or end.
        let mut blocks = Vec::new();
        let mut rest = &body[o as usize..];
        while !rest.is_empty() {
            let Some((bi, n)) = decode_block_info(rest) else {
                break;
            };
            if bi.length == 0 {
                break;
            }
            blocks.push(bi);
            rest = &rest[n..];
        }

        let data_size = data.metadata()?.len();
        let mmap = if data_size == 0 {
            None
        } else {
            // Read-only shared mapping; safe as long as the file is not
            // truncated underneath us, which segment immutability rules out.
            Some(unsafe { Mmap::map(&data)? })
        };

        let positions = record_positions(&key_index)?;

        Ok(Self {
            mmap,
            id,
            data,
            filter,
            key_index,
            blocks,
            positions,
            compress,
            poisoned: false,
        })
    }

    /// The segment's timestamp id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of records in the segment.
    #[must_use]
    pub fn len(&self) -> usize {
        self.key_index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key_index.is_empty()
    }

    /// Whether the key appears in this segment's key index.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Point lookup. `Ok(None)` when the key is not in the index.
    ///
    /// The record's block is resolved from its physical position and
    /// scanned from the block start until the key matches.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if self.poisoned {
            return Err(SegmentError::Poisoned);
        }
        let Some(i) = self.find(key) else {
            return Ok(None);
        };

        let block = self.block_containing(self.positions[i])?;
        let data = self.block_bytes(block)?;

        let mut iter = ChunkIterator::new(data);
        while iter.next() {
            if iter.key() == key {
                return Ok(Some(iter.value().to_vec()));
            }
            if iter.key() > key {
                break;
            }
        }
        let corrupt = iter.corrupt();
        self.poisoned = true;
        if corrupt {
            Err(SegmentError::Format("corrupt block".into()))
        } else {
            Err(SegmentError::Format(
                "key index and data file disagree".into(),
            ))
        }
    }

    /// Range read, both bounds inclusive. Both keys must be present in this
    /// segment's key index.
    ///
    /// Decodes the contiguous byte region from the start record through the
    /// end record and returns a [`Cursor`] over the materialised pairs.
    pub fn range(&mut self, start: &[u8], end: &[u8]) -> Result<Cursor> {
        if self.poisoned {
            return Err(SegmentError::Poisoned);
        }
        let i1 = self.find(start).ok_or(SegmentError::KeyNotFound)?;
        let i2 = self.find(end).ok_or(SegmentError::KeyNotFound)?;

        let data = self.data_bytes();
        let from = self.positions[i1] as usize;
        let to = if i2 + 1 < self.positions.len() {
            self.positions[i2 + 1] as usize
        } else {
            data.len()
        };
        if from > to || to > data.len() {
            self.poisoned = true;
            return Err(SegmentError::Format(
                "record positions beyond data file".into(),
            ));
        }

        let mut out = Vec::with_capacity(i2.saturating_sub(i1) + 1);
        let mut iter = ChunkIterator::new(&data[from..to]);
        while iter.next() {
            out.push((iter.key().to_vec(), iter.value().to_vec()));
        }
        let corrupt = iter.corrupt();
        if corrupt {
            self.poisoned = true;
            return Err(SegmentError::Format("corrupt record region".into()));
        }
        Ok(Cursor::new(out))
    }

    /// Drops the mapping and the file handles.
    pub fn close(self) {}

    fn find(&self, key: &[u8]) -> Option<usize> {
        self.key_index
            .binary_search_by(|e| e.key.as_slice().cmp(key))
            .ok()
    }

    fn data_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    fn block_containing(&self, pos: u64) -> Result<BlockInfo> {
        let idx = self.blocks.partition_point(|b| b.start <= pos);
        if idx == 0 {
            return Err(SegmentError::Format(format!(
                "no block contains offset {}",
                pos
            )));
        }
        let block = self.blocks[idx - 1];
        if pos >= block.start + block.length {
            return Err(SegmentError::Format(format!(
                "offset {} past the end of its block",
                pos
            )));
        }
        Ok(block)
    }

    fn block_bytes(&self, block: BlockInfo) -> Result<&[u8]> {
        let data = self.data_bytes();
        let start = block.start as usize;
        let end = start
            .checked_add(block.length as usize)
            .filter(|&e| e <= data.len())
            .ok_or_else(|| SegmentError::Format("block beyond data file".into()))?;
        Ok(&data[start..end])
    }
}

/// Physical start offsets of every record, reconstructed from the logical
/// key index.
fn record_positions(key_index: &[KeyIndexEntry]) -> Result<Vec<u64>> {
    let mut positions = Vec::with_capacity(key_index.len());
    let mut header_sum = 0u64;
    for (i, entry) in key_index.iter().enumerate() {
        positions.push(entry.key_offset + header_sum);
        if i + 1 < key_index.len() {
            let key_len = entry.key.len() as u64;
            let next_offset = key_index[i + 1].key_offset;
            let value_len = next_offset
                .checked_sub(entry.key_offset)
                .and_then(|span| span.checked_sub(key_len))
                .ok_or_else(|| {
                    SegmentError::Format("key index offsets not monotonic".into())
                })?;
            header_sum += uvarint_len(key_len) + uvarint_len(value_len);
        }
    }
    Ok(positions)
}
