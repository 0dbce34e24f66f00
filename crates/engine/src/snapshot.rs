//! Persistence of the C0 memtable across clean shutdowns.
//!
//! On close the memtable is written to `memfs.gob` as a bincode-encoded
//! record array; on open a readable snapshot is absorbed and the file
//! deleted (the write-ahead log, rotated only at flush, still covers its
//! content should the process die before the next flush).

use memtable::{Memtable, Record};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use crate::{Error, Result};

/// Writes the memtable's record array to `path`.
pub fn persist(path: &Path, memdb: &Memtable) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    bincode::serialize_into(BufWriter::new(file), &memdb.to_records())
        .map_err(|e| Error::Snapshot(format!("encode: {}", e)))
}

/// Reads a record array from `path`. `Ok(None)` when the file does not
/// exist; `Err` when it exists but cannot be decoded.
pub fn load(path: &Path) -> Result<Option<Vec<Record>>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::Io(e)),
    };
    bincode::deserialize_from(BufReader::new(file))
        .map(Some)
        .map_err(|e| Error::Snapshot(format!("decode: {}", e)))
}
