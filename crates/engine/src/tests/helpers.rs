use bloom::ScalableBloomFilter;
use segment::{Segment, SegmentWriter};
use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::Options;

/// Read-write options for tests (the default option set is read-only).
pub fn rw() -> Options {
    Options {
        read_only: false,
        use_compression: false,
        sync_write: false,
    }
}

/// Writes a complete segment triple directly into `dir`, bypassing the
/// engine's flush threshold. Records must be sorted by key; values are raw
/// bytes (pass [`crate::TOMBSTONE`] for a logical delete).
pub fn plant_segment(dir: &Path, id: &str, records: &[(&[u8], &[u8])]) {
    fs::create_dir_all(dir).unwrap();
    let open = |ext: &str| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(format!("{}.{}", id, ext)))
            .unwrap()
    };
    let seg = Segment::new(
        id.to_string(),
        open("data"),
        open("meta"),
        open("filter"),
    );
    let mut writer = SegmentWriter::new(seg, false);

    let mut filter = ScalableBloomFilter::new(0.0001);
    for (key, _) in records {
        filter.add(key);
    }
    filter.write_to(writer.filter_file()).unwrap();

    for (key, value) in records {
        writer.set(key, value).unwrap();
    }
    writer.close().unwrap();
}

/// Counts files in `dir` with the given extension.
pub fn count_files_with_ext(dir: &Path, ext: &str) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|x| x == ext)
                .unwrap_or(false)
        })
        .count()
}

/// Counts complete segment triples in `dir`.
pub fn count_segments(dir: &Path) -> usize {
    count_files_with_ext(dir, "data")
}
