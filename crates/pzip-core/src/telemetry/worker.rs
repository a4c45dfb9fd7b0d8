use std::time::Duration;

use crate::telemetry::{self, Subsystem, profile, tags};
use crate::types::{ChunkRange, duration_to_us};

/// Telemetry hooks invoked by chunk worker threads.
///
/// The fan-out calls these around every chunk task, so implementations must
/// be cheap and thread-safe.
pub trait WorkerTelemetry: Send + Sync {
    fn on_task_started(&self, chunk_index: usize, range: ChunkRange);
    fn on_task_finished(&self, chunk_index: usize, range: ChunkRange, elapsed: Duration);
    fn on_task_failed(&self, chunk_index: usize, range: ChunkRange, elapsed: Duration);
}

/// Default telemetry implementation that reports worker metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWorkerTelemetry;

impl WorkerTelemetry for DefaultWorkerTelemetry {
    fn on_task_started(&self, chunk_index: usize, range: ChunkRange) {
        telemetry::increment_counter(tags::METRIC_WORKER_TASK_START_COUNT, 1);
        telemetry::add_gauge(tags::METRIC_WORKER_ACTIVE_COUNT, 1);
        profile::event(Subsystem::Worker, "task_start", "ok", 0, "chunk task started");
        tracing::trace!(
            chunk = chunk_index,
            start = range.start,
            end = range.end,
            "chunk task started"
        );
    }

    fn on_task_finished(&self, chunk_index: usize, range: ChunkRange, elapsed: Duration) {
        let elapsed_us = duration_to_us(elapsed);
        telemetry::increment_counter(tags::METRIC_WORKER_TASK_FINISH_COUNT, 1);
        telemetry::record_histogram(tags::METRIC_WORKER_TASK_LATENCY_US, elapsed_us);
        telemetry::sub_gauge_saturating(tags::METRIC_WORKER_ACTIVE_COUNT, 1);
        profile::event(Subsystem::Worker, "task_finish", "ok", elapsed_us, "chunk task finished");
        tracing::trace!(
            chunk = chunk_index,
            bytes = range.len(),
            elapsed_us,
            "chunk task finished"
        );
    }

    fn on_task_failed(&self, chunk_index: usize, range: ChunkRange, elapsed: Duration) {
        let elapsed_us = duration_to_us(elapsed);
        telemetry::increment_counter(tags::METRIC_WORKER_TASK_FAIL_COUNT, 1);
        telemetry::record_histogram(tags::METRIC_WORKER_TASK_LATENCY_US, elapsed_us);
        telemetry::sub_gauge_saturating(tags::METRIC_WORKER_ACTIVE_COUNT, 1);
        profile::event(Subsystem::Worker, "task_finish", "error", elapsed_us, "chunk task failed");
        tracing::warn!(
            chunk = chunk_index,
            start = range.start,
            end = range.end,
            elapsed_us,
            "chunk task failed"
        );
    }
}
