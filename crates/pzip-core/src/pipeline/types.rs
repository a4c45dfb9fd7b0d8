use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::ChunkRuntimeSnapshot;

/// Suffix appended to an input path to name its encoded output.
pub const DEFAULT_OUTPUT_SUFFIX: &str = ".z";
/// Initial capacity of pooled payload buffers.
pub const DEFAULT_POOL_BUFFER_CAPACITY: usize = 64 * 1024;

/// Order in which chunk payloads reach the output sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteOrder {
    /// Payloads are appended in chunk-index order; output is deterministic.
    #[default]
    ChunkIndex,
    /// Each task appends as soon as it finishes; output order follows lock
    /// acquisition and can differ between runs.
    Completion,
}

/// How a chunk task sizes its private record buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferSizing {
    /// Reserve one record per input byte up front.
    #[default]
    WorstCase,
    /// Start empty and grow as records are produced.
    Incremental,
}

/// Configuration for a [`FileEncoder`](super::FileEncoder) run.
///
/// The worker count is fixed for the lifetime of the encoder and applies to
/// every file it processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Maximum number of chunks (and chunk threads) per file.
    pub workers: usize,
    /// Appended to each input path to name its output file.
    pub output_suffix: String,
    pub write_order: WriteOrder,
    pub buffer_sizing: BufferSizing,
    /// Initial capacity of pooled payload buffers.
    pub pool_buffer_capacity: usize,
    /// Idle buffers kept between chunks; defaults to one per worker.
    pub pool_max_buffers: Option<usize>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

impl EncoderConfig {
    /// Creates a configuration for `workers` chunk threads with default options.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            write_order: WriteOrder::default(),
            buffer_sizing: BufferSizing::default(),
            pool_buffer_capacity: DEFAULT_POOL_BUFFER_CAPACITY,
            pool_max_buffers: None,
        }
    }

    pub fn with_write_order(mut self, write_order: WriteOrder) -> Self {
        self.write_order = write_order;
        self
    }

    pub fn with_buffer_sizing(mut self, buffer_sizing: BufferSizing) -> Self {
        self.buffer_sizing = buffer_sizing;
        self
    }

    pub fn with_output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = suffix.into();
        self
    }

    pub(crate) fn effective_pool_buffers(&self) -> usize {
        self.pool_max_buffers.unwrap_or(self.workers).max(1)
    }
}

/// Result of encoding one input span or file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEncodeStats {
    /// Source file, when the span came from a file.
    pub input_path: Option<PathBuf>,
    /// Destination file, when the output went to a derived path.
    pub output_path: Option<PathBuf>,
    pub write_order: WriteOrder,
    pub elapsed: Duration,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub chunks: usize,
    pub records: u64,
    /// Time chunk payloads spent waiting for the sink lock.
    pub lock_wait: Duration,
    /// Chunk indices in the order they were appended to the output.
    pub append_order: Vec<usize>,
    /// Per-chunk task timings, sorted by chunk index.
    pub tasks: Vec<ChunkRuntimeSnapshot>,
}

impl FileEncodeStats {
    /// Output size relative to input size; `1.0` for empty input.
    pub fn output_ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            1.0
        } else {
            self.output_bytes as f64 / self.input_bytes as f64
        }
    }

    /// Average run length across the whole file.
    pub fn mean_run_length(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.input_bytes as f64 / self.records as f64
        }
    }
}

/// Result of a multi-file run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeRunStats {
    pub workers: usize,
    pub elapsed: Duration,
    /// Per-file results, in argument order.
    pub files: Vec<FileEncodeStats>,
}

impl EncodeRunStats {
    pub fn input_bytes_total(&self) -> u64 {
        self.files.iter().map(|file| file.input_bytes).sum()
    }

    pub fn output_bytes_total(&self) -> u64 {
        self.files.iter().map(|file| file.output_bytes).sum()
    }
}
