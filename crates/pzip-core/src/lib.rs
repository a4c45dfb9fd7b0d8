pub mod buffer;
pub mod codec;
pub mod core;
pub mod error;
pub mod format;
pub mod io;
pub mod pipeline;
pub mod telemetry;
pub mod types;

pub use buffer::{BufferPool, PoolMetricsSnapshot, PooledBuffer};
pub use codec::{EncodedChunk, encode_chunk, encode_range, encode_runs};
pub use crate::core::{ChunkFanOut, ChunkRuntimeSnapshot, FanOutSnapshot};
pub use error::PzipError;
pub use format::{RECORD_LEN, ReorderBuffer, SharedSink, SinkMetricsSnapshot};
pub use io::{ChunkPlanner, MmapInput, plan_chunks};
pub use pipeline::{
    BufferSizing, EncodeRunStats, EncoderConfig, FileEncodeStats, FileEncoder, WriteOrder,
    output_path_for,
};
pub use telemetry::worker::{DefaultWorkerTelemetry, WorkerTelemetry};
pub use types::{ChunkRange, Result, RunRecord};
