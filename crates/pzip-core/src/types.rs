use std::ops::Range;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PzipError;

pub type Result<T> = std::result::Result<T, PzipError>;

/// A contiguous, non-empty sub-range `[start, end)` of an input span.
///
/// Ranges are produced by the [`ChunkPlanner`](crate::ChunkPlanner) and
/// handed to exactly one encoding task each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkRange {
    pub start: usize,
    pub end: usize,
}

impl ChunkRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Checks that the range is non-empty and lies within a span of `len` bytes.
    pub fn validate(&self, len: usize) -> Result<()> {
        if self.is_empty() || self.end > len {
            return Err(PzipError::InvalidRange {
                start: self.start,
                end: self.end,
                len,
            });
        }
        Ok(())
    }
}

impl From<Range<usize>> for ChunkRange {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// One encoded unit: byte `value` repeated `count` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub count: usize,
    pub value: u8,
}

impl RunRecord {
    pub fn new(count: usize, value: u8) -> Self {
        Self { count, value }
    }
}

/// Converts a duration to whole microseconds, clamped to `u64::MAX`.
#[inline]
pub fn duration_to_us(duration: Duration) -> u64 {
    duration.as_micros().min(u64::MAX as u128) as u64
}
