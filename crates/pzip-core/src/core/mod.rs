pub mod fanout;

pub use fanout::{ChunkFanOut, ChunkRuntimeSnapshot, FanOutSnapshot};
