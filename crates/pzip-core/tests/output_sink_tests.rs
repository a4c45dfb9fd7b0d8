use std::io::{self, Write};
use std::sync::Arc;
use std::thread;

use pzip_core::{
    BufferPool, BufferSizing, ChunkRange, EncodedChunk, PzipError, RECORD_LEN, ReorderBuffer,
    SharedSink, encode_chunk,
};

fn chunk(pool: &BufferPool, index: usize, value: u8, len: usize) -> EncodedChunk {
    let span = vec![value; len];
    encode_chunk(&span, index, ChunkRange::new(0, len), BufferSizing::WorstCase, pool)
        .expect("chunk encodes")
}

struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn concurrent_appends_never_interleave_payloads() -> Result<(), Box<dyn std::error::Error>> {
    let pool = BufferPool::new(64, 4);
    let sink = Arc::new(SharedSink::new(Vec::new()));

    thread::scope(|scope| {
        for index in 0..8usize {
            let sink = Arc::clone(&sink);
            let pool = &pool;
            scope.spawn(move || {
                for round in 0..16usize {
                    // Alternating values give every chunk several records.
                    let span: Vec<u8> = (0..32)
                        .map(|position| if (position / 4) % 2 == 0 { index as u8 } else { 0xf0 })
                        .collect();
                    let chunk = encode_chunk(
                        &span,
                        index * 16 + round,
                        ChunkRange::new(0, span.len()),
                        BufferSizing::Incremental,
                        pool,
                    )
                    .expect("chunk encodes");
                    sink.append(&chunk).expect("append succeeds");
                }
            });
        }
    });

    let sink = Arc::into_inner(sink).ok_or("sink still shared")?;
    let (output, metrics) = sink.finish()?;
    assert_eq!(metrics.chunks, 128);
    assert_eq!(metrics.records, 128 * 8);
    assert_eq!(output.len() as u64, metrics.bytes);
    assert_eq!(output.len(), 128 * 8 * RECORD_LEN);

    // Every 8-record payload must be intact: its first value byte names the chunk owner.
    for payload in output.chunks_exact(8 * RECORD_LEN) {
        let owner = payload[RECORD_LEN - 1];
        for (position, record) in payload.chunks_exact(RECORD_LEN).enumerate() {
            let expected = if position % 2 == 0 { owner } else { 0xf0 };
            assert_eq!(record[RECORD_LEN - 1], expected);
        }
    }

    let mut order = metrics.append_order.clone();
    order.sort_unstable();
    assert_eq!(order, (0..128).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn metrics_track_appends_before_finish() -> Result<(), Box<dyn std::error::Error>> {
    let pool = BufferPool::new(16, 2);
    let sink = SharedSink::new(Vec::new());
    sink.append(&chunk(&pool, 1, b'b', 5))?;
    sink.append(&chunk(&pool, 0, b'a', 3))?;

    let metrics = sink.metrics()?;
    assert_eq!(metrics.chunks, 2);
    assert_eq!(metrics.records, 2);
    assert_eq!(metrics.append_order, vec![1, 0]);

    let (output, finished) = sink.finish()?;
    assert_eq!(finished.bytes, 2 * RECORD_LEN as u64);
    assert_eq!(output[RECORD_LEN - 1], b'b');
    Ok(())
}

#[test]
fn write_failure_is_reported_with_chunk_context() {
    let pool = BufferPool::new(16, 1);
    let sink = SharedSink::new(FailingWriter);
    let error = sink
        .append(&chunk(&pool, 7, b'z', 2))
        .expect_err("writer always fails");

    assert!(error.to_string().contains("appending chunk 7"));
    assert!(matches!(error.root(), PzipError::Io(io) if io.kind() == io::ErrorKind::StorageFull));
}

#[test]
fn reorder_buffer_releases_contiguous_prefixes() -> Result<(), Box<dyn std::error::Error>> {
    let mut reorder = ReorderBuffer::with_limit(4);

    assert!(reorder.push(2, "c")?.is_empty());
    assert!(reorder.push(1, "b")?.is_empty());
    assert_eq!(reorder.pending_len(), 2);
    assert_eq!(reorder.push(0, "a")?, vec!["a", "b", "c"]);
    assert_eq!(reorder.next_expected(), 3);
    assert_eq!(reorder.push(3, "d")?, vec!["d"]);
    assert!(reorder.is_drained());
    Ok(())
}

#[test]
fn reorder_buffer_rejects_stale_and_duplicate_indices() -> Result<(), Box<dyn std::error::Error>> {
    let mut reorder = ReorderBuffer::with_limit(4);
    reorder.push(0, 'a')?;
    reorder.push(2, 'c')?;

    assert!(matches!(
        reorder.push(0, 'x'),
        Err(PzipError::InvalidChunkIndex {
            expected: 1,
            actual: 0
        })
    ));
    assert!(matches!(reorder.push(2, 'y'), Err(PzipError::DuplicateChunk(2))));
    assert!(!reorder.is_drained());
    Ok(())
}

#[test]
fn reorder_buffer_enforces_pending_limit() -> Result<(), Box<dyn std::error::Error>> {
    let mut reorder = ReorderBuffer::with_limit(1);
    assert_eq!(reorder.max_pending(), 1);
    reorder.push(1, ())?;
    let error = reorder.push(2, ()).expect_err("limit is one pending item");
    assert!(matches!(error, PzipError::ReorderCapacity { limit: 1, index: 2 }));
    assert_eq!(reorder.pending_len(), 1);
    assert_eq!(reorder.push(0, ())?.len(), 2);
    Ok(())
}

#[test]
fn reorder_limit_is_at_least_one() {
    assert_eq!(ReorderBuffer::<u8>::with_limit(0).max_pending(), 1);
    assert_eq!(ReorderBuffer::<u8>::with_limit(16).max_pending(), 16);
}
