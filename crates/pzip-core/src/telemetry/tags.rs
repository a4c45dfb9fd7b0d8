//! Metric names, `pzip.<subsystem>.<metric>`; the subsystem segment selects
//! the registry bucket.

pub const METRIC_MMAP_OPEN_COUNT: &str = "pzip.mmap.open.count";
pub const METRIC_MMAP_OPEN_LATENCY_US: &str = "pzip.mmap.open.latency_us";
pub const METRIC_MMAP_MAPPED_BYTES: &str = "pzip.mmap.mapped_bytes";

pub const METRIC_PLANNER_PLAN_COUNT: &str = "pzip.planner.plan.count";
pub const METRIC_PLANNER_CHUNK_COUNT: &str = "pzip.planner.chunk.count";

pub const METRIC_CODEC_CHUNK_COUNT: &str = "pzip.codec.chunk.count";
pub const METRIC_CODEC_RECORD_COUNT: &str = "pzip.codec.record.count";
pub const METRIC_CODEC_INPUT_BYTES: &str = "pzip.codec.input_bytes";
pub const METRIC_CODEC_ENCODE_LATENCY_US: &str = "pzip.codec.encode.latency_us";
pub const METRIC_CODEC_ALLOC_FAIL_COUNT: &str = "pzip.codec.alloc_fail.count";

pub const METRIC_WRITER_APPEND_COUNT: &str = "pzip.writer.append.count";
pub const METRIC_WRITER_APPEND_BYTES: &str = "pzip.writer.append.bytes";
pub const METRIC_WRITER_LOCK_WAIT_US: &str = "pzip.writer.lock_wait_us";
pub const METRIC_WRITER_APPEND_LATENCY_US: &str = "pzip.writer.append.latency_us";

pub const METRIC_BUFFER_ACQUIRE_CREATED_COUNT: &str = "pzip.buffer.acquire.created.count";
pub const METRIC_BUFFER_ACQUIRE_RECYCLED_COUNT: &str = "pzip.buffer.acquire.recycled.count";
pub const METRIC_BUFFER_RECYCLE_OK_COUNT: &str = "pzip.buffer.recycle.ok.count";
pub const METRIC_BUFFER_RECYCLE_DROPPED_COUNT: &str = "pzip.buffer.recycle.dropped.count";
pub const METRIC_BUFFER_RECYCLE_SHRUNK_COUNT: &str = "pzip.buffer.recycle.shrunk.count";
pub const METRIC_BUFFER_POOLED_BYTES: &str = "pzip.buffer.pooled_bytes";

pub const METRIC_WORKER_TASK_START_COUNT: &str = "pzip.worker.task.start.count";
pub const METRIC_WORKER_TASK_FINISH_COUNT: &str = "pzip.worker.task.finish.count";
pub const METRIC_WORKER_TASK_FAIL_COUNT: &str = "pzip.worker.task.fail.count";
pub const METRIC_WORKER_TASK_LATENCY_US: &str = "pzip.worker.task.latency_us";
pub const METRIC_WORKER_ACTIVE_COUNT: &str = "pzip.worker.active.count";

pub const METRIC_PIPELINE_FILE_COUNT: &str = "pzip.pipeline.file.count";
pub const METRIC_PIPELINE_FILE_LATENCY_US: &str = "pzip.pipeline.file.latency_us";
pub const METRIC_PIPELINE_OUTPUT_BYTES: &str = "pzip.pipeline.output_bytes";
