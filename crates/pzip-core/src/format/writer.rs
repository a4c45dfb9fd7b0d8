use std::io::Write;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::codec::EncodedChunk;
use crate::telemetry::{self, Subsystem, profile, tags};
use crate::types::duration_to_us;
use crate::{PzipError, Result};

/// The output sink of one input file, shared by all of its chunk tasks.
///
/// Every [`append`](Self::append) takes the sink's mutex, writes one chunk's
/// whole payload and releases it, so payloads are never interleaved. The
/// sink imposes no order between chunks: whoever takes the lock first writes
/// first.
#[derive(Debug)]
pub struct SharedSink<W: Write> {
    state: Mutex<SinkState<W>>,
    chunks: AtomicUsize,
    records: AtomicU64,
    bytes: AtomicU64,
    lock_wait_us: AtomicU64,
}

#[derive(Debug)]
struct SinkState<W> {
    writer: W,
    append_order: Vec<usize>,
}

/// Counters collected by a [`SharedSink`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkMetricsSnapshot {
    pub chunks: usize,
    pub records: u64,
    pub bytes: u64,
    /// Total time appenders spent waiting for the lock.
    pub lock_wait: Duration,
    /// Chunk indices in the order their payloads reached the writer.
    pub append_order: Vec<usize>,
}

impl<W: Write> SharedSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            state: Mutex::new(SinkState {
                writer,
                append_order: Vec::new(),
            }),
            chunks: AtomicUsize::new(0),
            records: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            lock_wait_us: AtomicU64::new(0),
        }
    }

    /// Appends the full payload of `chunk` under the sink lock.
    ///
    /// # Errors
    /// Returns the underlying write error, or an error if another appender
    /// panicked while holding the lock.
    pub fn append(&self, chunk: &EncodedChunk) -> Result<()> {
        let started_at = Instant::now();
        let mut state = self.lock()?;
        let waited_us = profile::elapsed_us(started_at);

        state
            .writer
            .write_all(chunk.payload())
            .map_err(|error| {
                PzipError::from(error).with_context(format!("appending chunk {}", chunk.index))
            })?;
        state.append_order.push(chunk.index);
        drop(state);

        let payload_len = chunk.payload().len() as u64;
        self.chunks.fetch_add(1, Ordering::AcqRel);
        self.records
            .fetch_add(chunk.record_count as u64, Ordering::AcqRel);
        self.bytes.fetch_add(payload_len, Ordering::AcqRel);
        self.lock_wait_us.fetch_add(waited_us, Ordering::AcqRel);

        let elapsed_us = profile::elapsed_us(started_at);
        telemetry::increment_counter(tags::METRIC_WRITER_APPEND_COUNT, 1);
        telemetry::increment_counter(tags::METRIC_WRITER_APPEND_BYTES, payload_len);
        telemetry::record_histogram(tags::METRIC_WRITER_LOCK_WAIT_US, waited_us);
        telemetry::record_histogram(tags::METRIC_WRITER_APPEND_LATENCY_US, elapsed_us);
        profile::event(Subsystem::Writer, "append", "ok", elapsed_us, "chunk payload appended");

        Ok(())
    }

    /// Current counters; `append_order` reflects appends completed so far.
    pub fn metrics(&self) -> Result<SinkMetricsSnapshot> {
        let append_order = self.lock()?.append_order.clone();
        Ok(self.snapshot(append_order))
    }

    /// Flushes the sink and returns the inner writer with the final counters.
    pub fn finish(self) -> Result<(W, SinkMetricsSnapshot)> {
        let waited = Duration::from_micros(self.lock_wait_us.load(Ordering::Acquire));
        let mut state = self
            .state
            .into_inner()
            .map_err(|_| PzipError::WorkerPanicked("output sink lock poisoned".to_string()))?;
        state.writer.flush()?;

        let metrics = SinkMetricsSnapshot {
            chunks: self.chunks.into_inner(),
            records: self.records.into_inner(),
            bytes: self.bytes.into_inner(),
            lock_wait: waited,
            append_order: state.append_order,
        };
        Ok((state.writer, metrics))
    }

    fn snapshot(&self, append_order: Vec<usize>) -> SinkMetricsSnapshot {
        SinkMetricsSnapshot {
            chunks: self.chunks.load(Ordering::Acquire),
            records: self.records.load(Ordering::Acquire),
            bytes: self.bytes.load(Ordering::Acquire),
            lock_wait: Duration::from_micros(self.lock_wait_us.load(Ordering::Acquire)),
            append_order,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SinkState<W>>> {
        self.state
            .lock()
            .map_err(|_| PzipError::WorkerPanicked("output sink lock poisoned".to_string()))
    }
}

impl SinkMetricsSnapshot {
    pub fn lock_wait_us(&self) -> u64 {
        duration_to_us(self.lock_wait)
    }
}
