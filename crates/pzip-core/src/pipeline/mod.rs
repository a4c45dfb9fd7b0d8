//! Per-file driver: map, plan, fan out, write, finalize.

mod types;

pub use types::{
    BufferSizing, DEFAULT_OUTPUT_SUFFIX, DEFAULT_POOL_BUFFER_CAPACITY, EncodeRunStats,
    EncoderConfig, FileEncodeStats, WriteOrder,
};

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::buffer::BufferPool;
use crate::codec::{EncodedChunk, encode_chunk};
use crate::core::ChunkFanOut;
use crate::format::{ReorderBuffer, SharedSink};
use crate::io::{ChunkPlanner, MmapInput};
use crate::telemetry::worker::WorkerTelemetry;
use crate::telemetry::{self, Subsystem, profile, tags};
use crate::{PzipError, Result};

/// Encodes files one at a time, splitting each into parallel chunk tasks.
///
/// Every file gets its own generation of chunk threads and its own output
/// sink; the generation is joined and the sink flushed before the next file
/// starts.
pub struct FileEncoder {
    config: EncoderConfig,
    planner: ChunkPlanner,
    fanout: ChunkFanOut,
    buffer_pool: Arc<BufferPool>,
}

impl FileEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self::with_fanout(config, ChunkFanOut::new())
    }

    /// Creates an encoder that reports chunk task lifecycle to `telemetry`.
    pub fn with_telemetry(config: EncoderConfig, telemetry: Arc<dyn WorkerTelemetry>) -> Self {
        Self::with_fanout(config, ChunkFanOut::with_telemetry(telemetry))
    }

    fn with_fanout(config: EncoderConfig, fanout: ChunkFanOut) -> Self {
        let planner = ChunkPlanner::new(config.workers);
        let buffer_pool = Arc::new(BufferPool::new(
            config.pool_buffer_capacity,
            config.effective_pool_buffers(),
        ));
        Self {
            config,
            planner,
            fanout,
            buffer_pool,
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn workers(&self) -> usize {
        self.planner.workers()
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    /// Encodes every path in order, stopping at the first failure.
    ///
    /// Outputs of files completed before the failure are left on disk.
    pub fn encode_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<EncodeRunStats> {
        self.encode_files_with_progress(paths, |_| {})
    }

    /// Like [`encode_files`](Self::encode_files), calling `on_file` after each
    /// file has been fully written.
    pub fn encode_files_with_progress<P, F>(
        &self,
        paths: &[P],
        mut on_file: F,
    ) -> Result<EncodeRunStats>
    where
        P: AsRef<Path>,
        F: FnMut(&FileEncodeStats),
    {
        if paths.is_empty() {
            return Err(PzipError::Usage("no input files given"));
        }

        let started_at = Instant::now();
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let stats = self.encode_file(path.as_ref())?;
            on_file(&stats);
            files.push(stats);
        }

        Ok(EncodeRunStats {
            workers: self.workers(),
            elapsed: started_at.elapsed(),
            files,
        })
    }

    /// Encodes `path` into `path + suffix`, truncating any existing output.
    pub fn encode_file(&self, path: &Path) -> Result<FileEncodeStats> {
        let started_at = Instant::now();
        let result = self.encode_file_inner(path);
        let elapsed_us = profile::elapsed_us(started_at);

        match &result {
            Ok(stats) => {
                telemetry::increment_counter(tags::METRIC_PIPELINE_FILE_COUNT, 1);
                telemetry::record_histogram(tags::METRIC_PIPELINE_FILE_LATENCY_US, elapsed_us);
                telemetry::increment_counter(
                    tags::METRIC_PIPELINE_OUTPUT_BYTES,
                    stats.output_bytes,
                );
                profile::event(
                    Subsystem::Pipeline,
                    "encode_file",
                    "ok",
                    elapsed_us,
                    "file encoded",
                );
                tracing::info!(
                    input = %path.display(),
                    input_bytes = stats.input_bytes,
                    output_bytes = stats.output_bytes,
                    chunks = stats.chunks,
                    records = stats.records,
                    elapsed_us,
                    "file encoded"
                );
            }
            Err(error) => {
                profile::event(
                    Subsystem::Pipeline,
                    "encode_file",
                    "error",
                    elapsed_us,
                    "file encode failed",
                );
                tracing::debug!(input = %path.display(), %error, "file encode failed");
            }
        }

        result
    }

    fn encode_file_inner(&self, path: &Path) -> Result<FileEncodeStats> {
        let started_at = Instant::now();
        let input = MmapInput::open(path).map_err(|error| {
            error.with_context(format!("cannot open input '{}'", path.display()))
        })?;

        let output_path = output_path_for(path, &self.config.output_suffix);
        let output = File::create(&output_path).map_err(|error| {
            PzipError::from(error)
                .with_context(format!("cannot create output '{}'", output_path.display()))
        })?;

        let (writer, mut stats) = self
            .encode_span_to(input.as_slice(), BufWriter::new(output))
            .map_err(|error| error.with_context(format!("encoding '{}'", path.display())))?;
        writer.into_inner().map_err(|error| {
            PzipError::from(error.into_error())
                .with_context(format!("cannot finish output '{}'", output_path.display()))
        })?;
        drop(input);

        stats.input_path = Some(path.to_path_buf());
        stats.output_path = Some(output_path);
        stats.elapsed = started_at.elapsed();
        Ok(stats)
    }

    /// Encodes `span` into `writer` and returns the flushed writer.
    ///
    /// The span is planned into at most `workers` chunks, each encoded on its
    /// own thread. With [`WriteOrder::ChunkIndex`] the driver appends payloads
    /// in index order as soon as each prefix is complete; with
    /// [`WriteOrder::Completion`] every task appends its own payload under the
    /// sink lock.
    pub fn encode_span_to<W>(&self, span: &[u8], writer: W) -> Result<(W, FileEncodeStats)>
    where
        W: Write + Send,
    {
        let started_at = Instant::now();
        let ranges = self.planner.plan(span.len());
        tracing::debug!(
            input_bytes = span.len(),
            chunks = ranges.len(),
            workers = self.planner.workers(),
            order = ?self.config.write_order,
            "planned chunks"
        );

        let sink = SharedSink::new(writer);
        let sizing = self.config.buffer_sizing;
        let pool = self.buffer_pool.as_ref();

        let fanout = match self.config.write_order {
            WriteOrder::ChunkIndex => {
                let mut reorder = ReorderBuffer::with_limit(ranges.len());
                let snapshot = self.fanout.run(
                    &ranges,
                    |index, range| encode_chunk(span, index, range, sizing, pool),
                    |chunk: EncodedChunk| {
                        for ready in reorder.push(chunk.index, chunk)? {
                            sink.append(&ready)?;
                        }
                        Ok(())
                    },
                )?;
                if !reorder.is_drained() {
                    return Err(PzipError::InvalidChunkIndex {
                        expected: ranges.len(),
                        actual: reorder.next_expected(),
                    });
                }
                snapshot
            }
            WriteOrder::Completion => self.fanout.run(
                &ranges,
                |index, range| {
                    let chunk = encode_chunk(span, index, range, sizing, pool)?;
                    sink.append(&chunk)
                },
                |()| Ok(()),
            )?,
        };

        let (writer, metrics) = sink.finish()?;
        let stats = FileEncodeStats {
            input_path: None,
            output_path: None,
            write_order: self.config.write_order,
            elapsed: started_at.elapsed(),
            input_bytes: span.len() as u64,
            output_bytes: metrics.bytes,
            chunks: ranges.len(),
            records: metrics.records,
            lock_wait: metrics.lock_wait,
            append_order: metrics.append_order,
            tasks: fanout.tasks,
        };
        Ok((writer, stats))
    }
}

/// Derives the output path by appending `suffix` to the whole of `path`.
///
/// ```
/// use std::path::Path;
/// use pzip_core::output_path_for;
///
/// assert_eq!(output_path_for(Path::new("data/log.txt"), ".z"), Path::new("data/log.txt.z"));
/// ```
pub fn output_path_for(path: &Path, suffix: &str) -> PathBuf {
    let mut output = OsString::from(path.as_os_str());
    output.push(suffix);
    PathBuf::from(output)
}
