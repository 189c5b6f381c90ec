use super::partition::Chunk;
use super::scratch::ScratchSpace;
use crate::cipher::ChunkTransform;
use crate::error::{PipelineError, TransformError};
use crate::logging::LogHandle;
use crossbeam::channel::{Receiver, Sender, bounded};
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// A chunk bound to the transform that will process it. Consumed by exactly one worker.
pub struct WorkItem<'a, T> {
    pub chunk: Chunk<'a>,
    pub transform: &'a T,
}

/// Where a worker left the transformed text of one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkResult {
    pub order_key: usize,
    pub worker_id: usize,
    pub path: PathBuf,
    pub bytes: usize,
}

/// Bounded pool of worker threads writing chunk results to scratch storage.
///
/// Uses the same producer / workers / collector layout over bounded crossbeam
/// channels as the rest of the parallel module. The first failed chunk raises
/// an abort flag: workers stop taking new items, already-finished results are
/// discarded and the failure is returned with its order key.
pub struct WorkerPool<'s> {
    max_workers: usize,
    buffer_size: usize,
    scratch: &'s ScratchSpace,
    log: LogHandle,
}

/// Context for worker threads to avoid too many function parameters
struct WorkerContext<'a, 'env, T> {
    worker_id: usize,
    work_rx: Receiver<WorkItem<'env, T>>,
    result_tx: Sender<Result<WorkResult, PipelineError>>,
    abort: &'a AtomicBool,
    scratch: &'a ScratchSpace,
}

impl<'s> WorkerPool<'s> {
    pub fn new(max_workers: usize, scratch: &'s ScratchSpace, log: LogHandle) -> Self {
        Self::with_buffer_multiplier(max_workers, 2, scratch, log)
    }

    /// `buffer = workers * multiplier` slots per channel.
    pub fn with_buffer_multiplier(
        max_workers: usize,
        multiplier: usize,
        scratch: &'s ScratchSpace,
        log: LogHandle,
    ) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            max_workers,
            buffer_size: max_workers * multiplier.max(1),
            scratch,
            log,
        }
    }

    /// Process every chunk exactly once, or fail on the first worker error.
    ///
    /// Results come back in completion order; callers sort by `order_key`.
    /// A transform that panics counts as a failure of its chunk.
    ///
    /// There is no per-chunk timeout: a transform that never returns blocks
    /// this call indefinitely.
    pub fn run<T: ChunkTransform>(
        &self,
        chunks: Vec<Chunk<'_>>,
        transform: &T,
    ) -> Result<Vec<WorkResult>, PipelineError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let total = chunks.len();
        let workers = self.max_workers.min(total);
        self.log
            .info(format!("Dispatching {total} chunks to {workers} workers"));

        let (work_tx, work_rx) = bounded(self.buffer_size);
        let (result_tx, result_rx) = bounded(self.buffer_size);
        let abort = AtomicBool::new(false);

        let collected = crossbeam::thread::scope(|s| {
            let abort = &abort;

            for worker_id in 0..workers {
                let ctx = WorkerContext {
                    worker_id,
                    work_rx: work_rx.clone(),
                    result_tx: result_tx.clone(),
                    abort,
                    scratch: self.scratch,
                };
                s.spawn(move |_| worker_loop(ctx));
            }

            // Producer thread: feed chunks until done or aborted
            s.spawn(move |_| {
                for chunk in chunks {
                    if abort.load(Ordering::Acquire) {
                        break;
                    }
                    if work_tx.send(WorkItem { chunk, transform }).is_err() {
                        break; // Workers gone
                    }
                }
            });

            // Drop our copies so the result stream ends when workers finish
            drop(work_rx);
            drop(result_tx);

            self.collect_results(result_rx, abort)
        })
        .map_err(|_| PipelineError::WorkerPanic)?;

        let results = collected?;
        if results.len() != total {
            for result in &results {
                self.scratch.discard(&result.path);
            }
            return Err(PipelineError::Incomplete {
                expected: total,
                received: results.len(),
            });
        }
        Ok(results)
    }

    /// Gather results until every worker has hung up.
    fn collect_results(
        &self,
        result_rx: Receiver<Result<WorkResult, PipelineError>>,
        abort: &AtomicBool,
    ) -> Result<Vec<WorkResult>, PipelineError> {
        let mut results = Vec::new();
        let mut failure: Option<PipelineError> = None;

        for outcome in result_rx.iter() {
            match outcome {
                Ok(result) if failure.is_some() => self.scratch.discard(&result.path),
                Ok(result) => results.push(result),
                Err(e) if failure.is_some() => self.log.error_at("worker", &e),
                Err(e) => {
                    abort.store(true, Ordering::Release);
                    self.log.error_at("worker", &e);
                    failure = Some(e);
                }
            }
        }

        match failure {
            Some(e) => {
                for result in results {
                    self.scratch.discard(&result.path);
                }
                Err(e)
            }
            None => Ok(results),
        }
    }
}

fn worker_loop<T: ChunkTransform>(ctx: WorkerContext<'_, '_, T>) {
    let mut seq = 0;
    while let Ok(item) = ctx.work_rx.recv() {
        if ctx.abort.load(Ordering::Acquire) {
            break;
        }

        let outcome = execute(&item, ctx.worker_id, seq, ctx.scratch);
        seq += 1;
        if outcome.is_err() {
            ctx.abort.store(true, Ordering::Release);
        }

        if ctx.result_tx.send(outcome).is_err() {
            break; // Collector gone
        }
    }
}

fn execute<T: ChunkTransform>(
    item: &WorkItem<'_, T>,
    worker_id: usize,
    seq: usize,
    scratch: &ScratchSpace,
) -> Result<WorkResult, PipelineError> {
    let order_key = item.chunk.order_key;
    let failed = |source| PipelineError::Worker { order_key, source };

    let output = panic::catch_unwind(AssertUnwindSafe(|| item.transform.apply(item.chunk.text)))
        .unwrap_or_else(|payload| Err(TransformError::Panicked(panic_message(payload.as_ref()))))
        .map_err(failed)?;

    let path = scratch.allocate(worker_id, seq);
    fs::write(&path, output.as_bytes()).map_err(|source| {
        failed(TransformError::ScratchWrite {
            path: path.clone(),
            source,
        })
    })?;

    tracing::debug!(worker_id, order_key, "Chunk written to {}", path.display());
    Ok(WorkResult {
        order_key,
        worker_id,
        path,
        bytes: output.len(),
    })
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
