use thiserror::Error;

#[derive(Debug, Error)]
pub enum PzipError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("cannot allocate {bytes} bytes for an encoding buffer")]
    Allocation { bytes: usize },
    #[error("invalid chunk range {start}..{end} for span of {len} bytes")]
    InvalidRange { start: usize, end: usize, len: usize },
    #[error("invalid chunk index (expected {expected}, actual {actual})")]
    InvalidChunkIndex { expected: usize, actual: usize },
    #[error("chunk {0} submitted twice")]
    DuplicateChunk(usize),
    #[error("chunk {index} does not fit: {limit} chunks already waiting for a predecessor")]
    ReorderCapacity { limit: usize, index: usize },
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<PzipError>,
    },
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl PzipError {
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping any context layers.
    pub fn root(&self) -> &PzipError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}
