use std::io;
use std::sync::Arc;
use std::thread;

use pzip_core::BufferPool;

#[test]
fn acquire_recycle_cycle_reuses_buffers() {
    let pool = BufferPool::new(64, 2);
    assert_eq!(pool.default_capacity(), 64);
    assert_eq!(pool.max_buffers(), 2);

    {
        let mut buffer = pool.acquire();
        buffer.extend_from_slice(b"runs");
        assert_eq!(buffer.as_slice(), b"runs");
    }
    assert_eq!(pool.idle(), 1);

    {
        let buffer = pool.acquire();
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= 64);
    }

    let metrics = pool.metrics();
    assert_eq!(metrics.created, 1);
    assert_eq!(metrics.recycled, 1);
    assert_eq!(metrics.dropped, 0);
}

#[test]
fn full_pool_drops_extra_buffers() {
    let pool = BufferPool::new(32, 1);

    let first = pool.acquire();
    let second = pool.acquire();
    drop(first);
    drop(second);

    let metrics = pool.metrics();
    assert_eq!(metrics.created, 2);
    assert_eq!(metrics.dropped, 1);
    assert_eq!(pool.idle(), 1);
}

#[test]
fn zero_max_buffers_keeps_one() {
    let pool = BufferPool::new(8, 0);
    assert_eq!(pool.max_buffers(), 1);
}

#[test]
fn acquire_is_thread_safe() -> Result<(), Box<dyn std::error::Error>> {
    let pool = Arc::new(BufferPool::new(128, 8));
    let mut handles = Vec::new();

    for _ in 0..4 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            for _ in 0..500 {
                let mut buffer = pool.acquire();
                buffer.as_mut_vec().extend_from_slice(b"pzip");
            }
        }));
    }

    for handle in handles {
        handle
            .join()
            .map_err(|_| io::Error::other("worker thread panicked"))?;
    }

    let metrics = pool.metrics();
    assert!(metrics.created > 0);
    assert_eq!(metrics.created + metrics.recycled, 2000);
    Ok(())
}

#[test]
fn grown_buffer_is_shrunk_before_pooling() {
    let pool = BufferPool::new(64, 2);
    {
        let mut buffer = pool.acquire();
        buffer.reserve_exact(64 * 1024);
        buffer.extend_from_slice(&[7u8; 4096]);
    }

    assert_eq!(pool.idle(), 1);
    assert_eq!(pool.metrics().shrunk, 1);
    let recycled = pool.acquire();
    assert!(recycled.is_empty());
    assert!(recycled.capacity() <= pool.default_capacity());
}

#[test]
fn buffer_within_default_capacity_is_pooled_unchanged() {
    let pool = BufferPool::new(256, 1);
    {
        let mut buffer = pool.acquire();
        buffer.extend_from_slice(b"short");
    }
    assert_eq!(pool.metrics().shrunk, 0);
    assert!(pool.acquire().capacity() >= 256);
}

