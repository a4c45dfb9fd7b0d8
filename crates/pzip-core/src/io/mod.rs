pub mod mmap;
pub mod planner;

pub use mmap::MmapInput;
pub use planner::{ChunkPlanner, plan_chunks};
