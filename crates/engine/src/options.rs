/// Client-selectable behaviour for an open database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Open the database for reading only; writes are rejected and the
    /// directory lock is shared instead of exclusive.
    pub read_only: bool,

    /// Latent per-block compression hook, threaded through the segment
    /// writer and reader. No current code path compresses.
    pub use_compression: bool,

    /// Fsync the write-ahead log after every append.
    pub sync_write: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            read_only: true,
            use_compression: true,
            sync_write: false,
        }
    }
}

impl Options {
    /// The default option set with writes enabled.
    #[must_use]
    pub fn read_write() -> Self {
        Self {
            read_only: false,
            ..Self::default()
        }
    }
}
