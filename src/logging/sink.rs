use super::record::{LogRecord, Severity};
use super::rotation::RotatingFile;
use anyhow::{Context, Result, anyhow};
use crossbeam::channel::{self, Receiver, Sender, select};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const STOPPED: u8 = 0;
const RUNNING: u8 = 1;
const DRAINING: u8 = 2;

/// Lifecycle of the sink: `Running -> Draining -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Stopped,
    Running,
    Draining,
}

impl SinkState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            RUNNING => SinkState::Running,
            DRAINING => SinkState::Draining,
            _ => SinkState::Stopped,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogSinkConfig {
    pub path: PathBuf,
    pub max_bytes: u64,
    pub flush_interval: Duration,
}

/// Process-wide asynchronous log writer.
///
/// Producers hold a [`LogHandle`] and only pay for a channel send. A single
/// background thread wakes every `flush_interval` (or immediately on shutdown),
/// drains everything queued, rotates the file if needed and appends the batch.
pub struct LogSink {
    records: Sender<LogRecord>,
    shutdown: Sender<()>,
    state: Arc<AtomicU8>,
    flusher: Option<JoinHandle<()>>,
    path: PathBuf,
}

impl LogSink {
    pub fn start(config: LogSinkConfig) -> Result<Self> {
        let file = RotatingFile::open(&config.path, config.max_bytes)
            .with_context(|| format!("Failed to open log file {}", config.path.display()))?;

        let (records_tx, records_rx) = channel::unbounded();
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);
        let state = Arc::new(AtomicU8::new(RUNNING));

        let interval = config.flush_interval;
        let flusher = thread::Builder::new()
            .name("shiftpipe-log-sink".to_string())
            .spawn(move || run_flusher(records_rx, shutdown_rx, file, interval))
            .context("Failed to spawn log sink thread")?;

        Ok(Self {
            records: records_tx,
            shutdown: shutdown_tx,
            state,
            flusher: Some(flusher),
            path: config.path,
        })
    }

    /// A producer handle tagging every record with `origin`.
    pub fn handle(&self, origin: impl Into<String>) -> LogHandle {
        LogHandle {
            origin: Arc::from(origin.into()),
            records: self.records.clone(),
        }
    }

    pub fn state(&self) -> SinkState {
        SinkState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain whatever is still queued and wait for the flush thread to exit.
    ///
    /// Records sent after this call begins are not guaranteed to be written.
    pub fn stop(&mut self) -> Result<()> {
        let Some(flusher) = self.flusher.take() else {
            return Ok(());
        };

        self.state.store(DRAINING, Ordering::Release);
        // A full buffer means a stop signal is already pending.
        let _ = self.shutdown.try_send(());
        let joined = flusher.join();
        self.state.store(STOPPED, Ordering::Release);

        joined.map_err(|_| anyhow!("Log sink thread panicked"))
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            eprintln!("log sink shutdown failed: {e}");
        }
    }
}

fn run_flusher(
    records: Receiver<LogRecord>,
    shutdown: Receiver<()>,
    mut file: RotatingFile,
    interval: Duration,
) {
    let ticker = channel::tick(interval);
    let mut pending = Vec::new();

    loop {
        select! {
            recv(ticker) -> _ => flush(&records, &mut file, &mut pending),
            recv(shutdown) -> _ => {
                flush(&records, &mut file, &mut pending);
                if !pending.is_empty() {
                    eprintln!(
                        "log sink stopped with {} unwritten records for {}",
                        pending.len(),
                        file.path().display()
                    );
                }
                break;
            }
        }
    }
}

/// Drain the queue and append it. On failure the batch is kept for the next cycle.
fn flush(records: &Receiver<LogRecord>, file: &mut RotatingFile, pending: &mut Vec<LogRecord>) {
    pending.extend(records.try_iter());
    if pending.is_empty() {
        return;
    }

    match file.write_batch(pending) {
        Ok(archived) => {
            if let Some(archive) = archived {
                tracing::debug!("Rotated log file to {}", archive.display());
            }
            pending.clear();
        }
        Err(e) => {
            eprintln!(
                "log write to {} failed, retrying {} records next cycle: {e}",
                file.path().display(),
                pending.len()
            );
        }
    }
}

/// Cheap, cloneable producer side of the [`LogSink`].
///
/// Every call is mirrored to `tracing` for console output.
#[derive(Clone)]
pub struct LogHandle {
    origin: Arc<str>,
    records: Sender<LogRecord>,
}

impl LogHandle {
    /// Handle plus the receiving end, for components exercised without a sink.
    pub fn channel(origin: impl Into<String>) -> (Self, Receiver<LogRecord>) {
        let (tx, rx) = channel::unbounded();
        let handle = LogHandle {
            origin: Arc::from(origin.into()),
            records: tx,
        };
        (handle, rx)
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(origin = %self.origin, "{message}");
        self.enqueue(Severity::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(origin = %self.origin, "{message}");
        self.enqueue(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(origin = %self.origin, "{message}");
        self.enqueue(Severity::Error, message);
    }

    /// `location: error`
    pub fn error_at(&self, location: &str, error: impl Display) {
        self.error(format!("{location}: {error}"));
    }

    fn enqueue(&self, severity: Severity, message: String) {
        let record = LogRecord::new(severity, &*self.origin, message);
        if self.records.send(record).is_err() {
            tracing::debug!("Log sink already stopped, record dropped");
        }
    }
}
