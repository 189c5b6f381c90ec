//! # shiftpipe - parallel chunked shift cipher
//!
//! shiftpipe applies a reversible letter-shift transform to a text file by
//! splitting it into chunks, transforming each chunk on its own worker thread
//! and reassembling the results in their original order.
//!
//! - **Load-aware sizing**: worker count follows idle CPU capacity, capped by `--processes`
//! - **Order by key, not content**: every chunk carries the order key it was created with
//! - **Scratch storage**: partial results live in a per-run directory that is always removed
//! - **Asynchronous logging**: records are queued and flushed by a background thread,
//!   with size-based rotation to timestamped archives
//!
//! ## Quick Start
//!
//! ```bash
//! shiftpipe encrypt message.txt message.enc --shift 3
//! shiftpipe decrypt message.enc message.txt --shift 3 --processes 4
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use shiftpipe::cipher::{Direction, ShiftParams};
//! use shiftpipe::logging::{LogSink, LogSinkConfig};
//! use shiftpipe::pipeline::{Pipeline, PipelineOptions};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! let mut sink = LogSink::start(LogSinkConfig {
//!     path: "app.log".into(),
//!     max_bytes: 5 * 1024 * 1024,
//!     flush_interval: Duration::from_millis(500),
//! })?;
//!
//! let pipeline = Pipeline::new(PipelineOptions::default(), sink.handle("CAESAR_CIPHER"));
//! let summary = pipeline.process_file(
//!     Path::new("in.txt"),
//!     Path::new("out.txt"),
//!     ShiftParams::new(3, Direction::Forward),
//!     None,
//! )?;
//! println!("{} chunks on {} workers", summary.chunks, summary.workers);
//!
//! sink.stop()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cipher;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod parallel;
pub mod pipeline;

pub use config::ShiftpipeConfig;
pub use error::{EstimationError, PipelineError, TransformError};

/// Result type alias for top-level operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
