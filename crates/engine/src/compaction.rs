//! Compaction: merging buckets of segments into fresh ones and deleting
//! the sources.
//!
//! The compactor runs against a *quiesced* database directory. It opens its
//! own [`FsManager`], which contends on the same advisory lock a live
//! database holds — so compacting while a writable database is open fails
//! with [`Error::Timeout`] instead of racing the writer.

use bloom::ScalableBloomFilter;
use segment::{ChunkIterator, MergingIterator, SegmentError, SegmentWriter};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::filesystem::FsManager;
use crate::{Error, Options, Result};

/// Smallest number of segments worth merging.
pub const MIN_BUCKET: usize = 2;

/// Largest number of segments merged in one pass.
pub const MAX_BUCKET: usize = 8;

/// False-positive target of the filters built for compacted segments.
const COMPACTION_FP_RATE: f64 = 0.01;

/// Lifecycle of one bucket. Only `Processed` buckets have their source
/// segments deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    Pending,
    Processing,
    Processed,
    Failed,
}

struct Bucket {
    files: Vec<String>,
    state: BucketState,
}

/// Outcome of one bucket's merge.
#[derive(Debug)]
pub struct BucketStats {
    pub files_before: usize,
    pub files_after: usize,
    pub keys_before: u64,
    pub keys_after: u64,
    pub elapsed: Duration,
    /// Set when the bucket failed; its sources were kept.
    pub error: Option<Error>,
}

/// Merges size-bounded buckets of segments into fresh segments.
pub struct Compactor {
    fs: FsManager,
    options: Options,
    filter: ScalableBloomFilter,
    files: Vec<String>,
    buckets: Vec<Bucket>,
}

impl Compactor {
    /// Opens the database directory (acquiring its lock) and enumerates the
    /// segments present.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Compactor> {
        let options = Options {
            read_only: false,
            use_compression: true,
            sync_write: false,
        };
        let dir: PathBuf = dir.as_ref().components().collect();
        let mut fs = FsManager::new(dir, options.read_only);
        fs.open_db()?;
        let files = fs.data_file_ids()?;
        Ok(Compactor {
            fs,
            options,
            filter: ScalableBloomFilter::new(COMPACTION_FP_RATE),
            files,
            buckets: Vec::new(),
        })
    }

    /// Number of segments the compactor found at construction.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.files.len()
    }

    /// Runs one compaction batch over all buckets.
    ///
    /// Buckets are processed sequentially. A bucket that fails any step is
    /// marked [`BucketState::Failed`], its partial output is removed and
    /// its sources are kept; the batch continues with the next bucket. The
    /// sources of every `Processed` bucket are deleted once the whole batch
    /// has run.
    pub fn compact(&mut self) -> Result<Vec<BucketStats>> {
        if self.files.len() < MIN_BUCKET {
            tracing::info!(segments = self.files.len(), "not enough segments to compact");
            return Ok(Vec::new());
        }

        self.buckets.clear();
        let files = self.files.clone();
        make_buckets(&files, &mut self.buckets);

        let mut stats = Vec::with_capacity(self.buckets.len());
        for i in 0..self.buckets.len() {
            self.buckets[i].state = BucketState::Processing;
            let bucket_files = self.buckets[i].files.clone();
            let started = Instant::now();

            match self.compact_bucket(&bucket_files) {
                Ok((keys_before, keys_after)) => {
                    self.buckets[i].state = BucketState::Processed;
                    let elapsed = started.elapsed();
                    tracing::info!(
                        files_before = bucket_files.len(),
                        files_after = 1,
                        keys_before,
                        keys_after,
                        ?elapsed,
                        "compacted bucket"
                    );
                    stats.push(BucketStats {
                        files_before: bucket_files.len(),
                        files_after: 1,
                        keys_before,
                        keys_after,
                        elapsed,
                        error: None,
                    });
                }
                Err(e) => {
                    self.buckets[i].state = BucketState::Failed;
                    tracing::warn!(
                        files = bucket_files.len(),
                        error = %e,
                        "bucket compaction failed, sources kept"
                    );
                    stats.push(BucketStats {
                        files_before: bucket_files.len(),
                        files_after: bucket_files.len(),
                        keys_before: 0,
                        keys_after: 0,
                        elapsed: started.elapsed(),
                        error: Some(e),
                    });
                }
            }
        }

        for bucket in &self.buckets {
            if bucket.state != BucketState::Processed {
                continue;
            }
            for id in &bucket.files {
                if let Err(e) = self.fs.delete_segment(id) {
                    tracing::warn!(segment = %id, error = %e, "failed to delete compacted source");
                }
            }
        }
        Ok(stats)
    }

    /// Merges one bucket into a fresh segment, returning
    /// `(keys_before, keys_after)`.
    fn compact_bucket(&mut self, files: &[String]) -> Result<(u64, u64)> {
        // Newest first: index 0 takes precedence on duplicate keys.
        let mut ids = files.to_vec();
        ids.sort();
        ids.reverse();

        let mut buffers = Vec::with_capacity(ids.len());
        for id in &ids {
            buffers.push(std::fs::read(self.fs.data_path(id))?);
        }
        let iters: Vec<ChunkIterator> = buffers.iter().map(|b| ChunkIterator::new(b)).collect();
        let mut merge = MergingIterator::new(iters);

        let seg = self.fs.new_segment()?;
        let out_id = seg.id.clone();
        let mut writer = SegmentWriter::new(seg, self.options.use_compression);

        let result = (|| -> Result<(u64, u64)> {
            while merge.next() {
                self.filter.add(merge.key());
                writer.set(merge.key(), merge.value())?;
            }
            if merge.corrupt() {
                return Err(Error::Segment(SegmentError::Format(
                    "corrupt record in source data file".into(),
                )));
            }
            self.filter.write_to(writer.filter_file())?;
            writer.close()?;
            Ok((merge.keys_seen(), merge.keys_emitted()))
        })();
        self.filter.reset();

        match result {
            Ok(counts) => Ok(counts),
            Err(e) => {
                // Remove the partial output so a failed bucket leaves the
                // directory exactly as it found it.
                drop(writer);
                let _ = self.fs.delete_segment(&out_id);
                Err(e)
            }
        }
    }
}

/// Recursively halves `files` until every chunk's length is within
/// `[MIN_BUCKET, MAX_BUCKET]`.
fn make_buckets(files: &[String], out: &mut Vec<Bucket>) {
    if files.len() <= MAX_BUCKET {
        if files.len() >= MIN_BUCKET {
            out.push(Bucket {
                files: files.to_vec(),
                state: BucketState::Pending,
            });
        }
        return;
    }
    let mid = files.len() / 2;
    make_buckets(&files[..mid], out);
    make_buckets(&files[mid..], out);
}

#[cfg(test)]
pub(crate) fn bucket_sizes(ids: &[String]) -> Vec<usize> {
    let mut out = Vec::new();
    make_buckets(ids, &mut out);
    out.iter().map(|b| b.files.len()).collect()
}
