use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, unbounded};
use serde::{Deserialize, Serialize};

use crate::telemetry::worker::{DefaultWorkerTelemetry, WorkerTelemetry};
use crate::PzipError;
use crate::types::{ChunkRange, Result};

/// Runs one OS thread per chunk range and joins them all before returning.
///
/// Tasks only borrow what they read (the caller's input span lives across the
/// scope), report their result over a channel, and are joined as a single
/// generation: [`run`](Self::run) returns only once every spawned thread has
/// exited.
pub struct ChunkFanOut {
    telemetry: Arc<dyn WorkerTelemetry>,
}

/// Timing of one chunk task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRuntimeSnapshot {
    pub index: usize,
    pub range: ChunkRange,
    /// Offset from the start of the fan-out to the task starting work.
    pub started: Duration,
    pub busy: Duration,
    pub succeeded: bool,
}

/// Outcome of one fan-out generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOutSnapshot {
    pub elapsed: Duration,
    /// Chunk indices in the order their results reached the caller.
    pub completion_order: Vec<usize>,
    /// Per-task timings, sorted by chunk index.
    pub tasks: Vec<ChunkRuntimeSnapshot>,
}

struct TaskOutcome<T> {
    runtime: ChunkRuntimeSnapshot,
    result: Result<T>,
}

impl Default for ChunkFanOut {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkFanOut {
    pub fn new() -> Self {
        Self::with_telemetry(Arc::new(DefaultWorkerTelemetry))
    }

    pub fn with_telemetry(telemetry: Arc<dyn WorkerTelemetry>) -> Self {
        Self { telemetry }
    }

    /// Runs `task(index, range)` on its own thread for every range.
    ///
    /// Each successful result is handed to `on_complete` on the calling
    /// thread as soon as it arrives, so callbacks observe completion order.
    /// After the first failure (a task error, a caught panic, or an error
    /// from `on_complete`) later results are discarded, but every thread is
    /// still joined before the error is returned.
    pub fn run<T, F, C>(
        &self,
        ranges: &[ChunkRange],
        task: F,
        mut on_complete: C,
    ) -> Result<FanOutSnapshot>
    where
        T: Send,
        F: Fn(usize, ChunkRange) -> Result<T> + Sync,
        C: FnMut(T) -> Result<()>,
    {
        let started_at = Instant::now();
        let task = &task;
        let telemetry = self.telemetry.as_ref();

        thread::scope(|scope| {
            let (results_tx, results_rx) = unbounded::<TaskOutcome<T>>();
            let mut handles = Vec::with_capacity(ranges.len());
            let mut first_error: Option<PzipError> = None;

            for (index, range) in ranges.iter().copied().enumerate() {
                let worker_tx = results_tx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("pzip-chunk-{index}"))
                    .spawn_scoped(scope, move || {
                        run_task(index, range, started_at, task, telemetry, worker_tx);
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(error) => {
                        first_error = Some(
                            PzipError::from(error)
                                .with_context(format!("spawning worker for chunk {index}")),
                        );
                        break;
                    }
                }
            }
            drop(results_tx);

            let mut completion_order = Vec::with_capacity(handles.len());
            let mut tasks = Vec::with_capacity(handles.len());
            // Ends once every worker has dropped its sender.
            for outcome in results_rx.iter() {
                completion_order.push(outcome.runtime.index);
                tasks.push(outcome.runtime);
                match outcome.result {
                    Ok(value) if first_error.is_none() => {
                        if let Err(error) = on_complete(value) {
                            first_error = Some(error);
                        }
                    }
                    Ok(_) => {}
                    Err(error) => {
                        if first_error.is_none() {
                            first_error = Some(error);
                        }
                    }
                }
            }

            for handle in handles {
                if let Err(payload) = handle.join() {
                    if first_error.is_none() {
                        first_error = Some(PzipError::WorkerPanicked(panic_message(
                            payload.as_ref(),
                        )));
                    }
                }
            }

            if let Some(error) = first_error {
                return Err(error);
            }

            tasks.sort_by_key(|runtime| runtime.index);
            Ok(FanOutSnapshot {
                elapsed: started_at.elapsed(),
                completion_order,
                tasks,
            })
        })
    }
}

fn run_task<T, F>(
    index: usize,
    range: ChunkRange,
    fanout_started_at: Instant,
    task: &F,
    telemetry: &dyn WorkerTelemetry,
    results_tx: Sender<TaskOutcome<T>>,
) where
    F: Fn(usize, ChunkRange) -> Result<T>,
{
    let started = fanout_started_at.elapsed();
    telemetry.on_task_started(index, range);
    let task_started_at = Instant::now();

    let result = match catch_unwind(AssertUnwindSafe(|| task(index, range))) {
        Ok(result) => result,
        Err(payload) => Err(PzipError::WorkerPanicked(format!(
            "chunk {index}: {}",
            panic_message(payload.as_ref())
        ))),
    };

    let busy = task_started_at.elapsed();
    match &result {
        Ok(_) => telemetry.on_task_finished(index, range, busy),
        Err(_) => telemetry.on_task_failed(index, range, busy),
    }

    let runtime = ChunkRuntimeSnapshot {
        index,
        range,
        started,
        busy,
        succeeded: result.is_ok(),
    };
    // The receiver outlives every worker inside the scope.
    let _ = results_tx.send(TaskOutcome { runtime, result });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
