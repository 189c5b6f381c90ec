//! End-to-end file processing
//!
//! Drives one run through the four stages, in this order and never overlapping:
//!
//! 1. **Estimate** how many workers the machine can take ([`ResourceEstimator`])
//! 2. **Partition** the payload into order-tagged chunks ([`split`])
//! 3. **Dispatch** chunks to the worker pool, which writes them to scratch storage
//! 4. **Reassemble** the scratch files by order key and release the scratch space
//!
//! Any fatal error is logged as `process_file: <error>` before it is returned.

pub mod reassemble;

pub use reassemble::{merge, reassemble};

use crate::cipher::{CaesarShift, ChunkTransform, ShiftParams};
use crate::error::PipelineError;
use crate::logging::LogHandle;
use crate::parallel::{
    LoadSampler, ResourceEstimator, ScratchSpace, WorkerPool, split, worker_budget,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Tunables for a pipeline run, usually built from the `[pipeline]` config section.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub sample_window: Duration,
    /// Parent of the per-run scratch directory. Defaults to the output's directory.
    pub scratch_dir: Option<PathBuf>,
    pub channel_buffer_multiplier: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            sample_window: Duration::from_secs(1),
            scratch_dir: None,
            channel_buffer_multiplier: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub chunks: usize,
    pub workers: usize,
    pub bytes_written: u64,
    pub elapsed: Duration,
}

pub struct Pipeline {
    options: PipelineOptions,
    log: LogHandle,
}

impl Pipeline {
    pub fn new(options: PipelineOptions, log: LogHandle) -> Self {
        Self { options, log }
    }

    /// Shift-cipher `input` into `output` using a load-aware number of workers.
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        params: ShiftParams,
        max_workers: Option<usize>,
    ) -> Result<RunSummary, PipelineError> {
        let estimator = ResourceEstimator::new(self.options.sample_window, self.log.clone());
        self.process_file_with(&estimator, &CaesarShift::new(params), input, output, max_workers)
    }

    /// Same as [`Pipeline::process_file`] with an explicit estimator and transform.
    pub fn process_file_with<S: LoadSampler, T: ChunkTransform>(
        &self,
        estimator: &ResourceEstimator<S>,
        transform: &T,
        input: &Path,
        output: &Path,
        max_workers: Option<usize>,
    ) -> Result<RunSummary, PipelineError> {
        self.run(estimator, transform, input, output, max_workers)
            .inspect_err(|e| self.log.error_at("process_file", e))
    }

    fn run<S: LoadSampler, T: ChunkTransform>(
        &self,
        estimator: &ResourceEstimator<S>,
        transform: &T,
        input: &Path,
        output: &Path,
        max_workers: Option<usize>,
    ) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        self.log
            .info(format!("Processing started: {}", input.display()));

        let payload = fs::read_to_string(input).map_err(|source| PipelineError::Input {
            path: input.to_path_buf(),
            source,
        })?;

        let workers = worker_budget(estimator.estimate(), max_workers);
        self.log.info(format!("Using {workers} workers"));

        let chunks = split(&payload, workers)?;
        let chunk_count = chunks.len();

        let scratch = ScratchSpace::create_in(&self.scratch_parent(output))?;
        let pool = WorkerPool::with_buffer_multiplier(
            workers,
            self.options.channel_buffer_multiplier,
            &scratch,
            self.log.clone(),
        );

        let results = match pool.run(chunks, transform) {
            Ok(results) => results,
            Err(e) => {
                if let Err(cleanup) = scratch.release() {
                    self.log.error_at("scratch cleanup", cleanup);
                }
                return Err(e);
            }
        };

        let bytes_written = reassemble(results, output, scratch)?;
        let elapsed = started.elapsed();
        self.log.info(format!(
            "File processed successfully: {}. Elapsed: {:.2} s",
            output.display(),
            elapsed.as_secs_f64()
        ));

        Ok(RunSummary {
            chunks: chunk_count,
            workers,
            bytes_written,
            elapsed,
        })
    }

    fn scratch_parent(&self, output: &Path) -> PathBuf {
        if let Some(dir) = &self.options.scratch_dir {
            return dir.clone();
        }
        output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
