//! Output wire format and the writers that produce it.
//!
//! An encoded file is a flat concatenation of run records with no header,
//! footer or chunk delimiters. Each record is the run count as a native-endian
//! `usize` followed by the repeated byte.

pub mod reorder;
pub mod writer;

use std::mem::size_of;

pub use reorder::ReorderBuffer;
pub use writer::{SharedSink, SinkMetricsSnapshot};

use crate::types::RunRecord;

/// Width of the count field in bytes (host `usize`).
pub const COUNT_LEN: usize = size_of::<usize>();
/// Serialized size of one run record.
pub const RECORD_LEN: usize = COUNT_LEN + 1;

/// Appends the serialized form of one record to `out`.
#[inline]
pub fn write_record(record: RunRecord, out: &mut Vec<u8>) {
    out.extend_from_slice(&record.count.to_ne_bytes());
    out.push(record.value);
}

/// Appends the serialized form of every record, in order, to `out`.
pub fn serialize_records(records: &[RunRecord], out: &mut Vec<u8>) {
    out.reserve(records.len().saturating_mul(RECORD_LEN));
    for &record in records {
        write_record(record, out);
    }
}
