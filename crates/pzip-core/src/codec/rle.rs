use std::mem::size_of;
use std::time::Instant;

use crate::buffer::{BufferPool, PooledBuffer};
use crate::error::PzipError;
use crate::format::{self, RECORD_LEN};
use crate::pipeline::BufferSizing;
use crate::telemetry::{self, Subsystem, profile, tags};
use crate::types::{ChunkRange, Result, RunRecord};

/// The serialized output of one chunk task, ready to be appended to a sink.
#[derive(Debug)]
pub struct EncodedChunk {
    /// Position of the chunk in the file's plan.
    pub index: usize,
    pub range: ChunkRange,
    pub record_count: usize,
    /// `record_count * RECORD_LEN` bytes in the output format.
    pub payload: PooledBuffer,
}

impl EncodedChunk {
    pub fn payload(&self) -> &[u8] {
        self.payload.as_slice()
    }
}

/// Run-length encodes a byte slice into records, in scan order.
///
/// ```
/// use pzip_core::{RunRecord, encode_runs};
///
/// let records = encode_runs(b"aaabbbbc");
/// assert_eq!(
///     records,
///     vec![RunRecord::new(3, b'a'), RunRecord::new(4, b'b'), RunRecord::new(1, b'c')]
/// );
/// ```
pub fn encode_runs(bytes: &[u8]) -> Vec<RunRecord> {
    Runs::new(bytes).collect()
}

/// Encodes the bytes of `range` within `span`.
///
/// Nothing outside `range` is read: a run that continues past `range.end` is
/// cut there, so adjacent chunks never share a record.
///
/// # Errors
/// Returns [`PzipError::InvalidRange`] if `range` is empty or not inside
/// `span`, and [`PzipError::Allocation`] if the record buffer cannot be
/// reserved.
pub fn encode_range(
    span: &[u8],
    range: ChunkRange,
    sizing: BufferSizing,
) -> Result<Vec<RunRecord>> {
    range.validate(span.len())?;
    let bytes = &span[range.as_range()];

    let mut records = Vec::new();
    if sizing == BufferSizing::WorstCase {
        // One record per byte is the most a chunk can produce.
        reserve(&mut records, bytes.len())?;
    }
    records.extend(Runs::new(bytes));
    Ok(records)
}

/// Encodes one planned chunk straight into a pooled payload buffer.
///
/// This is the body of a chunk task: it only reads `span` and owns everything
/// it produces. Records are serialized as they are scanned, so the payload is
/// the only buffer; with [`BufferSizing::WorstCase`] it is reserved once at
/// `range.len() * RECORD_LEN` bytes.
pub fn encode_chunk(
    span: &[u8],
    index: usize,
    range: ChunkRange,
    sizing: BufferSizing,
    pool: &BufferPool,
) -> Result<EncodedChunk> {
    let started_at = Instant::now();
    let result = encode_chunk_inner(span, index, range, sizing, pool);
    let elapsed_us = profile::elapsed_us(started_at);

    match &result {
        Ok(chunk) => {
            telemetry::increment_counter(tags::METRIC_CODEC_CHUNK_COUNT, 1);
            telemetry::increment_counter(
                tags::METRIC_CODEC_RECORD_COUNT,
                chunk.record_count as u64,
            );
            telemetry::increment_counter(tags::METRIC_CODEC_INPUT_BYTES, range.len() as u64);
            telemetry::record_histogram(tags::METRIC_CODEC_ENCODE_LATENCY_US, elapsed_us);
            profile::event(Subsystem::Codec, "encode", "ok", elapsed_us, "chunk encoded");
        }
        Err(error) => {
            if matches!(error.root(), PzipError::Allocation { .. }) {
                telemetry::increment_counter(tags::METRIC_CODEC_ALLOC_FAIL_COUNT, 1);
            }
            profile::event(Subsystem::Codec, "encode", "error", elapsed_us, "chunk encode failed");
        }
    }

    result
}

fn encode_chunk_inner(
    span: &[u8],
    index: usize,
    range: ChunkRange,
    sizing: BufferSizing,
    pool: &BufferPool,
) -> Result<EncodedChunk> {
    range
        .validate(span.len())
        .map_err(|error| error.with_context(format!("encoding chunk {index}")))?;
    let bytes = &span[range.as_range()];

    let mut payload = pool.acquire();
    if sizing == BufferSizing::WorstCase {
        // Serialized worst case: every byte is its own run.
        let worst_case = bytes.len().saturating_mul(RECORD_LEN);
        payload
            .as_mut_vec()
            .try_reserve_exact(worst_case)
            .map_err(|_| {
                PzipError::Allocation { bytes: worst_case }
                    .with_context(format!("encoding chunk {index}"))
            })?;
    }

    let out = payload.as_mut_vec();
    let mut record_count = 0usize;
    for record in Runs::new(bytes) {
        format::write_record(record, out);
        record_count += 1;
    }

    Ok(EncodedChunk {
        index,
        range,
        record_count,
        payload,
    })
}

fn reserve(records: &mut Vec<RunRecord>, additional: usize) -> Result<()> {
    records
        .try_reserve_exact(additional)
        .map_err(|_| PzipError::Allocation {
            bytes: additional.saturating_mul(size_of::<RunRecord>()),
        })
}

/// Iterator over the maximal runs of a byte slice, in scan order.
struct Runs<'a> {
    bytes: &'a [u8],
}

impl<'a> Runs<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl Iterator for Runs<'_> {
    type Item = RunRecord;

    fn next(&mut self) -> Option<RunRecord> {
        let (&value, _) = self.bytes.split_first()?;
        let run = self.bytes.iter().take_while(|&&byte| byte == value).count();
        self.bytes = &self.bytes[run..];
        Some(RunRecord::new(run, value))
    }
}
