pub mod rle;

pub use rle::{EncodedChunk, encode_chunk, encode_range, encode_runs};
