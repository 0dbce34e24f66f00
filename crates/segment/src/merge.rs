//! N-way merge over chunk iterators with newest-wins conflict resolution.
//!
//! This is the compaction primitive: walk N sorted record streams, emit the
//! sorted union, and when the same key appears in several streams keep only
//! the copy from the stream with the lowest index (streams are ordered
//! newest segment first).

use crate::ChunkIterator;

/// Merges the sorted streams of several [`ChunkIterator`]s.
///
/// Index 0 must be the **newest** source. On each `next` the smallest
/// current key wins, ties break toward the lower index, and every other
/// iterator positioned on an equal key is advanced past its shadowed copy.
pub struct MergingIterator<'a> {
    iters: Vec<ChunkIterator<'a>>,
    key: &'a [u8],
    value: &'a [u8],
    emitted: u64,
}

impl<'a> MergingIterator<'a> {
    #[must_use]
    pub fn new(iters: Vec<ChunkIterator<'a>>) -> Self {
        Self {
            iters,
            key: &[],
            value: &[],
            emitted: 0,
        }
    }

    /// Advances to the next distinct key across all sources. Returns `false`
    /// once every source is exhausted.
    pub fn next(&mut self) -> bool {
        // First call: move every source onto its first record.
        for it in &mut self.iters {
            if it.is_start() {
                it.next();
            }
        }

        let mut least: Option<usize> = None;
        for (j, it) in self.iters.iter().enumerate() {
            if it.is_end() {
                continue;
            }
            match least {
                Some(k) if it.key() >= self.iters[k].key() => {}
                _ => least = Some(j),
            }
        }
        let Some(k) = least else {
            self.key = &[];
            self.value = &[];
            return false;
        };

        self.key = self.iters[k].key();
        self.value = self.iters[k].value();
        self.emitted += 1;

        // Advance the winner and every source holding a shadowed duplicate.
        let key = self.key;
        for it in &mut self.iters {
            if !it.is_end() && it.key() == key {
                it.next();
            }
        }
        true
    }

    /// The key selected by the latest `next`.
    #[must_use]
    pub fn key(&self) -> &'a [u8] {
        self.key
    }

    /// The value selected by the latest `next`.
    #[must_use]
    pub fn value(&self) -> &'a [u8] {
        self.value
    }

    /// Closes every underlying iterator.
    pub fn close(&mut self) {
        for it in &mut self.iters {
            it.close();
        }
    }

    /// Total records decoded across all sources (duplicates included).
    #[must_use]
    pub fn keys_seen(&self) -> u64 {
        self.iters.iter().map(ChunkIterator::decoded).sum()
    }

    /// Distinct keys emitted so far.
    #[must_use]
    pub fn keys_emitted(&self) -> u64 {
        self.emitted
    }

    /// True if any source hit a decode error.
    #[must_use]
    pub fn corrupt(&self) -> bool {
        self.iters.iter().any(ChunkIterator::corrupt)
    }
}
