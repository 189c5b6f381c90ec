//! Error types for the shiftpipe library.
//!
//! Fatal pipeline failures are collected into [`PipelineError`] so the caller can
//! log them once and shut the log sink down in order. Resource sampling failures
//! have their own [`EstimationError`] because they never abort a run.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to read input {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid partition request: {0}")]
    Partition(String),

    #[error("Worker failed on chunk {order_key}: {source}")]
    Worker {
        order_key: usize,
        #[source]
        source: TransformError,
    },

    #[error("Only {received} of {expected} chunks completed")]
    Incomplete { expected: usize, received: usize },

    /// A pool thread died outside the transform call.
    #[error("A worker thread panicked during parallel execution")]
    WorkerPanic,

    #[error("Scratch storage error at {path}: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Reassembly failed: {0}")]
    Reassembly(String),
}

impl PipelineError {
    /// Order key of the chunk that caused the failure, when there is one.
    pub fn order_key(&self) -> Option<usize> {
        match self {
            PipelineError::Worker { order_key, .. } => Some(*order_key),
            _ => None,
        }
    }
}

/// Failure of a single chunk inside a worker.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Transform rejected chunk: {0}")]
    Rejected(String),

    #[error("Transform panicked: {0}")]
    Panicked(String),

    #[error("Could not write scratch file {path}: {source}")]
    ScratchWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Resource sampling failure. Recovered locally by the estimator.
#[derive(Error, Debug)]
pub enum EstimationError {
    #[error("CPU load sampling is not supported on this platform")]
    Unsupported,

    #[error("Sampled utilization {0} is outside 0..=100")]
    InvalidReading(f32),
}
