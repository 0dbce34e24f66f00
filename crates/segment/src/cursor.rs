//! Cursor over a materialised range of records.

/// Iterates the records returned by a range read, ascending by key.
///
/// The cursor starts positioned *before* its first record: call
/// [`next`](Cursor::next) and, while it returns `true`, read
/// [`key`](Cursor::key) / [`value`](Cursor::value).
#[derive(Debug)]
pub struct Cursor {
    data: Vec<(Vec<u8>, Vec<u8>)>,
    pos: usize,
    started: bool,
}

impl Cursor {
    #[must_use]
    pub(crate) fn new(data: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            data,
            pos: 0,
            started: false,
        }
    }

    /// Advances to the next record; `false` once the range is exhausted.
    pub fn next(&mut self) -> bool {
        if self.started {
            self.pos += 1;
        } else {
            self.started = true;
        }
        self.pos < self.data.len()
    }

    /// The current record's key. Only meaningful while the latest `next`
    /// returned `true`.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.data[self.pos].0
    }

    /// The current record's value.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.data[self.pos].1
    }

    /// Number of records in the range.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Discards the cursor's data.
    pub fn close(&mut self) {
        self.data = Vec::new();
        self.pos = 0;
        self.started = false;
    }
}
