//! Parallel chunk execution
//!
//! Everything that decides *how many* workers run and *what* each of them gets.
//!
//! # Architecture Responsibilities
//!
//! ## What This Module Does:
//! - **Resource Discovery**: Counts logical CPUs with `num_cpus::get()` and samples load with `sysinfo`
//! - **Worker Budget**: Caps the load-aware estimate with the user's `--processes` ceiling
//! - **Partitioning**: Splits the payload into order-tagged chunks on character boundaries
//! - **Execution**: Runs a bounded crossbeam worker pool that writes each chunk to scratch storage
//!
//! ## What This Module Does NOT Do:
//! - **Ordering**: Results come back in completion order; `pipeline::reassemble` restores order
//! - **Cipher Logic**: Workers call whatever [`crate::cipher::ChunkTransform`] they are given
//!
//! ```text
//! ┌────────────┐    ┌─────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Estimator  │───▶│ Partitioner │───▶│ Worker pool  │───▶│ Scratch dir  │
//! │ load hint  │    │ Chunk{key}  │    │ N threads    │    │ w000-00000…  │
//! └────────────┘    └─────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use shiftpipe::cipher::{CaesarShift, Direction, ShiftParams};
//! use shiftpipe::logging::LogHandle;
//! use shiftpipe::parallel::{ScratchSpace, WorkerPool, split};
//! use std::path::Path;
//!
//! let (log, _records) = LogHandle::channel("EXAMPLE");
//! let scratch = ScratchSpace::create_in(Path::new("/tmp"))?;
//! let chunks = split("Attack at Dawn", 3)?;
//! let cipher = CaesarShift::new(ShiftParams::new(3, Direction::Forward));
//! let results = WorkerPool::new(3, &scratch, log).run(chunks, &cipher)?;
//! assert_eq!(results.len(), 3);
//! scratch.release()?;
//! # Ok::<(), shiftpipe::PipelineError>(())
//! ```

pub mod estimator;
pub mod partition;
pub mod pool;
pub mod scratch;

// Re-export main types for easier access
pub use estimator::{LoadSampler, ResourceEstimator, SystemSampler, worker_budget};
pub use partition::{Chunk, split};
pub use pool::{WorkItem, WorkResult, WorkerPool};
pub use scratch::ScratchSpace;
