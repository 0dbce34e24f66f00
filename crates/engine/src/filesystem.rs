//! Directory layout, file lifetimes and advisory locking.
//!
//! Everything that touches the database directory goes through the
//! [`FsManager`]: the `lock` file and its `flock`, the write-ahead log, the
//! per-segment file triples, and the rename/delete primitives the log
//! rotation relies on.

use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use segment::Segment;

use crate::{Error, Result};

/// Name of the advisory lock file.
const LOCK_FILE: &str = "lock";

/// Timestamp layout of a segment id, millisecond precision.
const ID_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

/// Extensions of the three files making up a segment.
pub const DATA_EXT: &str = "data";
pub const META_EXT: &str = "meta";
pub const FILTER_EXT: &str = "filter";

/// Pause between lock attempts.
const LOCK_RETRY: Duration = Duration::from_millis(50);

/// Overall budget for acquiring the directory lock.
const LOCK_TIMEOUT: Duration = Duration::from_millis(500);

/// Manages the database directory.
pub struct FsManager {
    path: PathBuf,
    read_only: bool,
    lock: Option<File>,
    /// Most recently issued segment id, for collision avoidance.
    last_id: String,
}

impl FsManager {
    #[must_use]
    pub fn new(path: PathBuf, read_only: bool) -> Self {
        Self {
            path,
            read_only,
            lock: None,
            last_id: String::new(),
        }
    }

    /// The database directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the directory if needed and acquires the advisory lock:
    /// exclusive for read-write managers, shared for read-only ones.
    /// Idempotent; the lock is held on return.
    pub fn open_db(&mut self) -> Result<()> {
        if self.lock.is_some() {
            return Ok(());
        }
        if !self.path.exists() {
            create_dir_0755(&self.path)?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(self.path.join(LOCK_FILE))?;
        acquire_flock(&lock_file, !self.read_only)?;
        self.lock = Some(lock_file);
        Ok(())
    }

    /// Releases the advisory lock. Releasing a shared lock is a no-op
    /// beyond dropping the handle.
    pub fn close(&mut self) -> Result<()> {
        if let Some(lock_file) = self.lock.take() {
            if !self.read_only {
                release_flock(&lock_file)?;
            }
        }
        Ok(())
    }

    /// Absolute path of a file inside the database directory.
    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Path of a segment's data file.
    #[must_use]
    pub fn data_path(&self, id: &str) -> PathBuf {
        self.path.join(format!("{}.{}", id, DATA_EXT))
    }

    /// Creates a fresh segment triple with append/write-only handles.
    ///
    /// The id is the wall clock at millisecond precision; when that would
    /// not sort strictly after the previously issued id (same-millisecond
    /// burst, clock step), a `-NNN` suffix is appended until it does.
    pub fn new_segment(&mut self) -> Result<Segment> {
        let id = self.next_id();
        let open = |name: String| -> io::Result<File> {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path.join(name))
        };
        let data = open(format!("{}.{}", id, DATA_EXT))?;
        let meta = open(format!("{}.{}", id, META_EXT))?;
        let filter = open(format!("{}.{}", id, FILTER_EXT))?;
        Ok(Segment::new(id, data, meta, filter))
    }

    /// Opens an existing segment triple read-only.
    pub fn open_segment(&self, id: &str) -> Result<Segment> {
        let open = |name: String| -> Result<File> {
            File::open(self.path.join(name)).map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    Error::FileDoesNotExist
                } else {
                    Error::Io(e)
                }
            })
        };
        let data = open(format!("{}.{}", id, DATA_EXT))?;
        let meta = open(format!("{}.{}", id, META_EXT))?;
        let filter = open(format!("{}.{}", id, FILTER_EXT))?;
        Ok(Segment::new(id.to_string(), data, meta, filter))
    }

    /// Deletes a segment's three files; absent files are skipped.
    pub fn delete_segment(&self, id: &str) -> Result<()> {
        for ext in [DATA_EXT, META_EXT, FILTER_EXT] {
            self.delete_file(&format!("{}.{}", id, ext))?;
        }
        Ok(())
    }

    /// Ids of all segments in the directory (files with the `.data`
    /// extension, extension stripped), sorted ascending — oldest first.
    pub fn data_file_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if path.extension().map(|e| e == DATA_EXT).unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Renames a file inside the directory. Fails with
    /// [`Error::FileDoesNotExist`] when the source is missing and
    /// [`Error::FileAlreadyExists`] when the target is present.
    pub fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        let old_path = self.path.join(old_name);
        let new_path = self.path.join(new_name);
        if !old_path.exists() {
            return Err(Error::FileDoesNotExist);
        }
        if new_path.exists() {
            return Err(Error::FileAlreadyExists);
        }
        fs::rename(old_path, new_path)?;
        Ok(())
    }

    /// Deletes a file inside the directory; a no-op when absent.
    pub fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.path.join(name);
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn next_id(&mut self) -> String {
        let base = Utc::now().format(ID_FORMAT).to_string();
        let mut id = base.clone();
        let mut n = 0u32;
        while id <= self.last_id {
            n += 1;
            id = format!("{}-{:03}", base, n);
        }
        self.last_id = id.clone();
        id
    }
}

impl Drop for FsManager {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn create_dir_0755(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o755).create(path)
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(path)
    }
}

/// Retries the non-blocking `flock` every [`LOCK_RETRY`] until it succeeds
/// or [`LOCK_TIMEOUT`] elapses.
fn acquire_flock(file: &File, exclusive: bool) -> Result<()> {
    let started = Instant::now();
    loop {
        match try_flock(file, exclusive) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                if started.elapsed() >= LOCK_TIMEOUT {
                    return Err(Error::Timeout);
                }
                std::thread::sleep(LOCK_RETRY);
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

#[cfg(unix)]
fn try_flock(file: &File, exclusive: bool) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let flag = if exclusive {
        libc::LOCK_EX
    } else {
        libc::LOCK_SH
    };
    let rc = unsafe { libc::flock(file.as_raw_fd(), flag | libc::LOCK_NB) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(unix)]
fn release_flock(file: &File) -> Result<()> {
    use std::os::unix::io::AsRawFd;
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    if rc != 0 {
        return Err(Error::Io(io::Error::last_os_error()));
    }
    Ok(())
}

// Non-Unix builds fall back to the lock file's existence only.
#[cfg(not(unix))]
fn try_flock(_file: &File, _exclusive: bool) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn release_flock(_file: &File) -> Result<()> {
    Ok(())
}
