use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::telemetry::{self, Subsystem, profile, tags};

/// A pool of reusable byte buffers for serialized chunk payloads.
///
/// Chunk tasks acquire a buffer, serialize their run records into it and hand
/// it to the writer. Once the payload has been appended the buffer drops back
/// into the pool, so later chunks (and later files) reuse the allocation.
///
/// Idle buffers never keep more than `default_capacity` bytes: a buffer that
/// grew past it for a large chunk is shrunk on its way back, so the memory of
/// one file's worst-case payloads is released when its chunks are written.
///
/// # Example
/// ```
/// use pzip_core::BufferPool;
///
/// let pool = BufferPool::new(4096, 8);
/// let mut buffer = pool.acquire();
/// buffer.extend_from_slice(b"payload");
/// drop(buffer); // returns to pool automatically
/// assert_eq!(pool.metrics().created, 1);
/// ```
#[derive(Debug)]
pub struct BufferPool {
    recycler: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
    default_capacity: usize,
    max_buffers: usize,
    metrics: Arc<PoolMetricsInner>,
}

impl BufferPool {
    /// Creates a pool whose fresh buffers start with `default_capacity` bytes
    /// and which retains at most `max_buffers` idle buffers.
    pub fn new(default_capacity: usize, max_buffers: usize) -> Self {
        let max_buffers = max_buffers.max(1);
        let (recycler, receiver) = bounded(max_buffers);
        Self {
            recycler,
            receiver,
            default_capacity,
            max_buffers,
            metrics: Arc::new(PoolMetricsInner::default()),
        }
    }

    /// Acquires an empty buffer, recycled when one is idle in the pool.
    pub fn acquire(&self) -> PooledBuffer {
        let started_at = Instant::now();
        let (result, buffer) = match self.receiver.try_recv() {
            Ok(mut buffer) => {
                buffer.clear();
                self.metrics.recycled.fetch_add(1, Ordering::Relaxed);
                telemetry::increment_counter(tags::METRIC_BUFFER_ACQUIRE_RECYCLED_COUNT, 1);
                telemetry::sub_gauge_saturating(
                    tags::METRIC_BUFFER_POOLED_BYTES,
                    buffer.capacity() as u64,
                );
                ("recycled", buffer)
            }
            Err(_) => {
                self.metrics.created.fetch_add(1, Ordering::Relaxed);
                telemetry::increment_counter(tags::METRIC_BUFFER_ACQUIRE_CREATED_COUNT, 1);
                ("created", Vec::with_capacity(self.default_capacity))
            }
        };
        profile::event(
            Subsystem::Buffer,
            "acquire",
            result,
            profile::elapsed_us(started_at),
            "buffer acquire completed",
        );

        PooledBuffer {
            buffer,
            retain_capacity: self.default_capacity,
            recycler: self.recycler.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Returns a snapshot of the current pool metrics.
    pub fn metrics(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            created: self.metrics.created.load(Ordering::Relaxed),
            recycled: self.metrics.recycled.load(Ordering::Relaxed),
            dropped: self.metrics.dropped.load(Ordering::Relaxed),
            shrunk: self.metrics.shrunk.load(Ordering::Relaxed),
        }
    }

    pub fn default_capacity(&self) -> usize {
        self.default_capacity
    }

    pub fn max_buffers(&self) -> usize {
        self.max_buffers
    }

    /// Number of idle buffers currently held by the pool.
    pub fn idle(&self) -> usize {
        self.receiver.len()
    }
}

/// A snapshot of buffer pool metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolMetricsSnapshot {
    /// Buffers allocated because the pool was empty.
    pub created: usize,
    /// Buffers handed out again after a previous use.
    pub recycled: usize,
    /// Buffers released while the pool was full.
    pub dropped: usize,
    /// Buffers shrunk back to the default capacity before being pooled.
    pub shrunk: usize,
}

#[derive(Debug, Default)]
struct PoolMetricsInner {
    created: AtomicUsize,
    recycled: AtomicUsize,
    dropped: AtomicUsize,
    shrunk: AtomicUsize,
}

/// A buffer on loan from a [`BufferPool`]; returned to the pool on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    buffer: Vec<u8>,
    retain_capacity: usize,
    recycler: Sender<Vec<u8>>,
    metrics: Arc<PoolMetricsInner>,
}

impl PooledBuffer {
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn as_mut_vec(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let mut buffer = std::mem::take(&mut self.buffer);
        if buffer.capacity() > self.retain_capacity {
            buffer.clear();
            buffer.shrink_to(self.retain_capacity);
            self.metrics.shrunk.fetch_add(1, Ordering::Relaxed);
            telemetry::increment_counter(tags::METRIC_BUFFER_RECYCLE_SHRUNK_COUNT, 1);
        }
        let capacity = buffer.capacity() as u64;
        if self.recycler.try_send(buffer).is_err() {
            self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
            telemetry::increment_counter(tags::METRIC_BUFFER_RECYCLE_DROPPED_COUNT, 1);
        } else {
            telemetry::increment_counter(tags::METRIC_BUFFER_RECYCLE_OK_COUNT, 1);
            telemetry::add_gauge(tags::METRIC_BUFFER_POOLED_BYTES, capacity);
        }
    }
}
