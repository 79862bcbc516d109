//! Scan windows.

use std::fmt;

/// A contiguous range of build numbers `[start, start + count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub start: u64,
    pub count: u64,
}

impl ScanWindow {
    /// Create a window of `count` builds starting at `start`.
    pub fn new(start: u64, count: u64) -> Self {
        // Clamp so `end()` cannot overflow.
        let count = count.min(u64::MAX - start);
        Self { start, count }
    }

    /// The window following a cursor: `[cursor + 1, cursor + size]`.
    pub fn after_cursor(cursor: u64, size: u64) -> Self {
        Self::new(cursor.saturating_add(1), size)
    }

    fn end(&self) -> u64 {
        self.start + self.count
    }

    /// Last build number in the window, if it is not empty.
    pub fn last(&self) -> Option<u64> {
        (self.count > 0).then(|| self.end() - 1)
    }
}

impl fmt::Display for ScanWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last() {
            Some(last) => write!(f, "{}..={}", self.start, last),
            None => write!(f, "{}..{} (empty)", self.start, self.start),
        }
    }
}
