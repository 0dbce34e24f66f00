use crate::format::put_uvarint;
use crate::Segment;
use std::fs::OpenOptions;
use std::path::Path;

mod iterator_tests;
mod merge_tests;

/// Creates the three files of a fresh segment in `dir`.
pub fn create_segment(dir: &Path, id: &str) -> Segment {
    let open = |ext: &str| {
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(dir.join(format!("{}.{}", id, ext)))
            .unwrap()
    };
    Segment::new(id.to_string(), open("data"), open("meta"), open("filter"))
}

/// Reopens an existing segment read-only.
pub fn open_segment(dir: &Path, id: &str) -> Segment {
    let open = |ext: &str| {
        OpenOptions::new()
            .read(true)
            .open(dir.join(format!("{}.{}", id, ext)))
            .unwrap()
    };
    Segment::new(id.to_string(), open("data"), open("meta"), open("filter"))
}

/// Encodes records the way a data block stores them, for iterator-level
/// tests that don't need files.
pub fn encode_records(records: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut buf = Vec::new();
    for (key, value) in records {
        put_uvarint(&mut buf, key.len() as u64);
        put_uvarint(&mut buf, value.len() as u64);
        buf.extend_from_slice(key);
        buf.extend_from_slice(value);
    }
    buf
}
