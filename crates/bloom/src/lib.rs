//! # Bloom — Scalable Bloom Filter
//!
//! A space-efficient probabilistic set-membership structure that grows with
//! its input. The filter can say with certainty that a key is **not** in the
//! set (no false negatives) but may occasionally claim a key **is** present
//! when it isn't. Unlike a plain Bloom filter, a scalable one does not need
//! its capacity up front: when the current partition fills up, a larger
//! partition with a tighter error share is appended, keeping the compound
//! false-positive rate bounded by the configured target.
//!
//! ## Usage in StrataKV
//!
//! Every segment carries a filter file built from its keys. Point lookups
//! test the filter before touching the segment's index or data file; a
//! negative test skips the segment entirely.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bloom::ScalableBloomFilter;
//!
//! let mut filter = ScalableBloomFilter::new(0.0001);
//! filter.add(b"hello");
//! assert!(filter.test(b"hello"));
//! filter.reset();
//! assert!(!filter.test(b"hello"));
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Number of keys the first partition is sized for.
const INITIAL_CAPACITY: u64 = 4096;

/// Share of the residual error budget granted to each successive partition.
const TIGHTENING_RATIO: f64 = 0.8;

/// Safety cap on a single partition's bit vector during deserialization.
const MAX_PARTITION_BYTES: usize = 128 * 1024 * 1024;

/// One fixed-size Bloom partition: a bit vector probed by `k` hash
/// functions derived via double hashing (`h(i) = h1 + i * h2`, FNV-1a with
/// two seeds).
struct Partition {
    bits: Vec<u8>,
    num_bits: u64,
    num_hashes: u32,
    capacity: u64,
    inserted: u64,
}

impl Partition {
    /// Sizes a partition for `capacity` keys at the given false-positive
    /// rate using the optimal `m = -n ln(p) / ln(2)^2`, `k = (m/n) ln(2)`.
    fn new(capacity: u64, fp_rate: f64) -> Self {
        let n = capacity as f64;
        let m = (-n * fp_rate.ln() / std::f64::consts::LN_2.powi(2)).ceil() as u64;
        let m = m.max(8);
        let k = ((m as f64 / n) * std::f64::consts::LN_2).ceil() as u32;
        let k = k.max(1);

        Self {
            bits: vec![0u8; ((m + 7) / 8) as usize],
            num_bits: m,
            num_hashes: k,
            capacity,
            inserted: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.inserted >= self.capacity
    }

    fn insert(&mut self, key: &[u8]) {
        let (h1, h2) = hash_pair(key);
        for i in 0..self.num_hashes {
            let idx = bit_index(h1, h2, i, self.num_bits);
            self.bits[(idx / 8) as usize] |= 1 << (idx % 8);
        }
        self.inserted += 1;
    }

    fn may_contain(&self, key: &[u8]) -> bool {
        let (h1, h2) = hash_pair(key);
        for i in 0..self.num_hashes {
            let idx = bit_index(h1, h2, i, self.num_bits);
            if self.bits[(idx / 8) as usize] >> (idx % 8) & 1 == 0 {
                return false;
            }
        }
        true
    }
}

/// A growable Bloom filter with a bounded compound false-positive rate.
///
/// Partition `i` is sized for `INITIAL_CAPACITY * 2^i` keys with an error
/// share of `target * (1 - r) * r^i`, so the sum over all partitions stays
/// under `target`.
pub struct ScalableBloomFilter {
    partitions: Vec<Partition>,
    target_fp_rate: f64,
}

impl ScalableBloomFilter {
    /// Creates an empty filter targeting the given compound false-positive
    /// rate.
    ///
    /// # Panics
    ///
    /// Panics if `target_fp_rate` is not in `(0, 1)`.
    pub fn new(target_fp_rate: f64) -> Self {
        assert!(
            target_fp_rate > 0.0 && target_fp_rate < 1.0,
            "target_fp_rate must be in (0, 1)"
        );
        Self {
            partitions: vec![Partition::new(
                INITIAL_CAPACITY,
                partition_fp_rate(target_fp_rate, 0),
            )],
            target_fp_rate,
        }
    }

    /// Adds a key to the filter, growing a new partition if the current one
    /// is at capacity.
    pub fn add(&mut self, key: &[u8]) {
        if self.partitions.last().map(Partition::is_full).unwrap_or(true) {
            let generation = self.partitions.len() as u32;
            let capacity = INITIAL_CAPACITY << generation.min(32);
            self.partitions.push(Partition::new(
                capacity,
                partition_fp_rate(self.target_fp_rate, generation),
            ));
        }
        // A partition is guaranteed to exist at this point.
        self.partitions.last_mut().unwrap().insert(key);
    }

    /// Returns `true` if the key **might** have been added, `false` if it
    /// **definitely** was not.
    #[must_use]
    pub fn test(&self, key: &[u8]) -> bool {
        self.partitions.iter().any(|p| p.may_contain(key))
    }

    /// Total number of keys added since creation or the last
    /// [`reset`](ScalableBloomFilter::reset).
    #[must_use]
    pub fn count(&self) -> u64 {
        self.partitions.iter().map(|p| p.inserted).sum()
    }

    /// Discards all state, returning the filter to a single empty partition.
    pub fn reset(&mut self) {
        self.partitions.clear();
        self.partitions.push(Partition::new(
            INITIAL_CAPACITY,
            partition_fp_rate(self.target_fp_rate, 0),
        ));
    }

    /// Serializes the filter.
    ///
    /// Wire format (all little-endian):
    /// ```text
    /// [target_fp_rate: f64][partition_count: u32]
    /// per partition:
    ///   [capacity: u64][inserted: u64][num_bits: u64][num_hashes: u32]
    ///   [bits_len: u32][bits: bytes]
    /// ```
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_f64::<LittleEndian>(self.target_fp_rate)?;
        w.write_u32::<LittleEndian>(self.partitions.len() as u32)?;
        for p in &self.partitions {
            w.write_u64::<LittleEndian>(p.capacity)?;
            w.write_u64::<LittleEndian>(p.inserted)?;
            w.write_u64::<LittleEndian>(p.num_bits)?;
            w.write_u32::<LittleEndian>(p.num_hashes)?;
            w.write_u32::<LittleEndian>(p.bits.len() as u32)?;
            w.write_all(&p.bits)?;
        }
        Ok(())
    }

    /// Deserializes a filter previously produced by
    /// [`write_to`](ScalableBloomFilter::write_to).
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let target_fp_rate = r.read_f64::<LittleEndian>()?;
        if !(target_fp_rate > 0.0 && target_fp_rate < 1.0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad filter error rate: {}", target_fp_rate),
            ));
        }
        let count = r.read_u32::<LittleEndian>()? as usize;
        let mut partitions = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let capacity = r.read_u64::<LittleEndian>()?;
            let inserted = r.read_u64::<LittleEndian>()?;
            let num_bits = r.read_u64::<LittleEndian>()?;
            let num_hashes = r.read_u32::<LittleEndian>()?;
            let bits_len = r.read_u32::<LittleEndian>()? as usize;
            if bits_len > MAX_PARTITION_BYTES {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("filter partition too large: {} bytes", bits_len),
                ));
            }
            if num_bits == 0 || num_bits > (bits_len as u64) * 8 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "filter partition bit count disagrees with bit vector",
                ));
            }
            let mut bits = vec![0u8; bits_len];
            r.read_exact(&mut bits)?;
            partitions.push(Partition {
                bits,
                num_bits,
                num_hashes,
                capacity,
                inserted,
            });
        }
        if partitions.is_empty() {
            return Ok(Self::new(target_fp_rate));
        }
        Ok(Self {
            partitions,
            target_fp_rate,
        })
    }
}

impl std::fmt::Debug for ScalableBloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalableBloomFilter")
            .field("target_fp_rate", &self.target_fp_rate)
            .field("partitions", &self.partitions.len())
            .field("count", &self.count())
            .finish()
    }
}

/// Error share assigned to partition `generation`: a geometric series that
/// sums to the compound target.
fn partition_fp_rate(target: f64, generation: u32) -> f64 {
    target * (1.0 - TIGHTENING_RATIO) * TIGHTENING_RATIO.powi(generation as i32)
}

/// Two independent 64-bit hashes from FNV-1a with different bases.
fn hash_pair(key: &[u8]) -> (u64, u64) {
    (
        fnv1a_64(key, 0xcbf29ce484222325),
        fnv1a_64(key, 0x517cc1b727220a95),
    )
}

/// Double hashing: `h(i) = (h1 + i * h2) mod num_bits`.
fn bit_index(h1: u64, h2: u64, i: u32, num_bits: u64) -> u64 {
    h1.wrapping_add((i as u64).wrapping_mul(h2)) % num_bits
}

/// FNV-1a 64-bit hash with a configurable starting basis.
fn fnv1a_64(data: &[u8], basis: u64) -> u64 {
    const FNV_PRIME: u64 = 0x00000100000001b3;
    let mut hash = basis;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
