//! Asynchronous, size-rotating log sink.
//!
//! Components never touch the log file. They receive a [`LogHandle`] and push
//! [`LogRecord`]s into a channel; the [`LogSink`] owns the only writer thread.
//!
//! ```text
//! producers ──send──▶ records channel ──drain every tick──▶ RotatingFile
//!                     shutdown channel ──final drain──────▶ (thread exits)
//! ```
//!
//! Lines are written as `[timestamp][severity][origin] message`.

pub mod record;
pub mod rotation;
pub mod sink;

pub use record::{LogRecord, Severity};
pub use rotation::RotatingFile;
pub use sink::{LogHandle, LogSink, LogSinkConfig, SinkState};
