use crate::telemetry::{self, Subsystem, profile, tags};
use crate::types::ChunkRange;

/// Splits an input span into at most `workers` contiguous chunks.
///
/// Planning is a pure function of `(len, workers)`: the chunk size is
/// `ceil(len / workers)`, candidate `i` covers
/// `[i * chunk_size, min((i + 1) * chunk_size, len))`, and empty candidates
/// are dropped. The surviving ranges tile `[0, len)` in order with no gaps or
/// overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlanner {
    workers: usize,
}

impl ChunkPlanner {
    /// Creates a planner for `workers` chunk tasks (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Plans the chunk ranges for a span of `len` bytes.
    pub fn plan(&self, len: usize) -> Vec<ChunkRange> {
        let ranges = plan_chunks(len, self.workers);

        telemetry::increment_counter(tags::METRIC_PLANNER_PLAN_COUNT, 1);
        telemetry::increment_counter(tags::METRIC_PLANNER_CHUNK_COUNT, ranges.len() as u64);
        profile::event(Subsystem::Planner, "plan", "ok", 0, "chunk plan computed");

        ranges
    }
}

/// Computes the chunk ranges for `len` bytes split across `workers` tasks.
///
/// `workers == 0` is treated as one worker. `len == 0` yields no ranges.
pub fn plan_chunks(len: usize, workers: usize) -> Vec<ChunkRange> {
    let workers = workers.max(1);
    if len == 0 {
        return Vec::new();
    }

    let chunk_size = len.div_ceil(workers);
    (0..workers)
        .map(|index| {
            let start = index.saturating_mul(chunk_size).min(len);
            let end = start.saturating_add(chunk_size).min(len);
            ChunkRange::new(start, end)
        })
        .filter(|range| !range.is_empty())
        .collect()
}
