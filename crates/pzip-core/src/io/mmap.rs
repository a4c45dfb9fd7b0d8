use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use memmap2::{Mmap, MmapOptions};

use crate::telemetry::{self, Subsystem, profile, tags};
use crate::types::{ChunkRange, Result};

/// Read-only memory-mapped view of one input file.
///
/// The mapping is the input span shared by every chunk task of a file: tasks
/// borrow it through [`as_slice`](Self::as_slice) and never mutate it. The
/// mapping is released when the value is dropped.
///
/// # Safety
///
/// The file must not be truncated or modified by another process while it is
/// mapped; see the `memmap2` documentation for the platform caveats.
///
/// # Example
/// ```no_run
/// use pzip_core::MmapInput;
/// use std::path::Path;
///
/// let input = MmapInput::open(Path::new("data.bin"))?;
/// let bytes = input.as_slice();
/// # let _ = bytes;
/// # Ok::<(), pzip_core::PzipError>(())
/// ```
#[derive(Debug)]
pub struct MmapInput {
    mmap: Option<Mmap>,
    path: PathBuf,
    len: u64,
}

impl MmapInput {
    /// Opens and maps `path` read-only.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, its size cannot be read,
    /// or the mapping fails.
    pub fn open(path: &Path) -> Result<Self> {
        let started_at = Instant::now();
        let result = Self::map_file(path);
        let elapsed_us = profile::elapsed_us(started_at);

        telemetry::increment_counter(tags::METRIC_MMAP_OPEN_COUNT, 1);
        telemetry::record_histogram(tags::METRIC_MMAP_OPEN_LATENCY_US, elapsed_us);

        match &result {
            Ok(input) => {
                telemetry::set_gauge(tags::METRIC_MMAP_MAPPED_BYTES, input.len_u64());
                profile::event(Subsystem::Mmap, "open", "ok", elapsed_us, "mmap open completed");
            }
            Err(error) => {
                profile::event(Subsystem::Mmap, "open", "error", elapsed_us, "mmap open failed");
                tracing::debug!(path = %path.display(), %error, "mmap open failed");
            }
        }

        result
    }

    fn map_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        // Zero-length mappings are rejected on several platforms.
        let mmap = if len == 0 {
            None
        } else {
            Some(unsafe { MmapOptions::new().map(&file)? })
        };

        Ok(Self {
            mmap,
            path: path.to_path_buf(),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len_u64(&self) -> u64 {
        self.len
    }

    /// File length as a usize, clamped to `usize::MAX`.
    pub fn len(&self) -> usize {
        self.len.min(usize::MAX as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The whole mapped file; empty for zero-length files.
    pub fn as_slice(&self) -> &[u8] {
        match &self.mmap {
            Some(map) => &map[..],
            None => &[],
        }
    }

    /// Borrows the bytes of one chunk range.
    ///
    /// # Errors
    /// Returns [`PzipError::InvalidRange`](crate::PzipError::InvalidRange) if
    /// the range is empty or extends past the end of the file.
    pub fn slice(&self, range: ChunkRange) -> Result<&[u8]> {
        let span = self.as_slice();
        range.validate(span.len())?;
        Ok(&span[range.as_range()])
    }
}
