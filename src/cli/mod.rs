//! Command-line interface for shiftpipe
//!
//! `shiftpipe <encrypt|decrypt> <INPUT> <OUTPUT> [--shift N] [--processes N]`
//!
//! The CLI owns the process lifecycle: it loads configuration, starts the log
//! sink, runs the pipeline and always stops the sink before returning, so a
//! fatal error is on disk before the process exits.

use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::RangedU64ValueParser;
use std::path::PathBuf;

mod output;

pub use output::Output;

use crate::cipher::{Direction, ShiftParams};
use crate::config::ShiftpipeConfig;
use crate::logging::{LogHandle, LogSink};
use crate::pipeline::Pipeline;

#[derive(Parser, Debug)]
#[command(
    name = crate::PKG_NAME,
    version = crate::VERSION,
    about = "Encrypt or decrypt a text file with a shift cipher, in parallel chunks",
    long_about = "shiftpipe splits the input into chunks, transforms them on a load-aware \
                  number of worker threads and reassembles the result in order. Activity \
                  is recorded in a size-rotated log file."
)]
pub struct Cli {
    /// Operation to perform
    #[arg(value_enum)]
    pub mode: Direction,

    /// File to read
    pub input: PathBuf,

    /// File to write
    pub output: PathBuf,

    /// Letters to shift by [default: 3, or pipeline.default_shift]
    #[arg(short, long, allow_negative_numbers = true)]
    pub shift: Option<i64>,

    /// Upper bound on worker threads
    #[arg(short, long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub processes: Option<usize>,

    /// Use custom configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn run(self, output: &Output) -> Result<()> {
        setup_logging(self.verbose, self.quiet);

        let config = ShiftpipeConfig::load(self.config.as_deref())?;
        let mut sink = LogSink::start(config.sink_config())?;
        let log = sink.handle(config.log.origin.clone());

        let result = self.execute(&config, &log, output);
        if let Err(e) = &result {
            log.error_at("main", format!("{e:#}"));
        }

        let stopped = sink.stop();
        prefer_run_error(result, stopped, output)
    }

    fn execute(&self, config: &ShiftpipeConfig, log: &LogHandle, output: &Output) -> Result<()> {
        let shift = self.shift.unwrap_or(config.pipeline.default_shift);
        let params = ShiftParams::new(shift, self.mode);

        log.info(format!(
            "Starting {}: {} -> {}",
            self.mode.verb(),
            self.input.display(),
            self.output.display()
        ));

        let pipeline = Pipeline::new(config.pipeline_options(), log.clone());
        let summary = pipeline
            .process_file(
                &self.input,
                &self.output,
                params,
                config.worker_cap(self.processes),
            )
            .with_context(|| format!("Failed to process {}", self.input.display()))?;

        output.success(&format!(
            "{} complete: {}",
            capitalize(self.mode.verb()),
            self.output.display()
        ));
        output.table_row("Chunks", &summary.chunks.to_string());
        output.table_row("Workers", &summary.workers.to_string());
        output.table_row("Bytes written", &summary.bytes_written.to_string());
        output.table_row("Elapsed", &format!("{:.2}s", summary.elapsed.as_secs_f64()));
        output.verbose(&format!("Log file: {}", config.log.file.display()));
        Ok(())
    }
}

/// A failed run outranks a failed sink shutdown, which is still reported.
fn prefer_run_error(result: Result<()>, stopped: Result<()>, output: &Output) -> Result<()> {
    match (result, stopped) {
        (Err(e), Err(stop_err)) => {
            output.error(&format!("Log sink shutdown failed: {stop_err:#}"));
            Err(e)
        }
        (result, stopped) => result.and(stopped),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // Console diagnostics go to stderr; stdout carries only the run summary
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["shiftpipe", "encrypt", "in.txt", "out.txt"]).unwrap();
        assert_eq!(cli.mode, Direction::Forward);
        assert_eq!(cli.shift, None);
        assert_eq!(cli.processes, None);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_parse_all_flags() {
        let cli = Cli::try_parse_from([
            "shiftpipe", "decrypt", "in.txt", "out.txt", "--shift", "-5", "--processes", "4",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.mode, Direction::Inverse);
        assert_eq!(cli.shift, Some(-5));
        assert_eq!(cli.processes, Some(4));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_rejects_zero_processes_and_unknown_mode() {
        assert!(Cli::try_parse_from(["shiftpipe", "encrypt", "a", "b", "--processes", "0"]).is_err());
        assert!(Cli::try_parse_from(["shiftpipe", "scramble", "a", "b"]).is_err());
    }

    #[test]
    fn test_run_error_wins_over_sink_shutdown_error() {
        let output = Output::new(false, true);
        let err = prefer_run_error(
            Err(anyhow::anyhow!("Failed to process in.txt")),
            Err(anyhow::anyhow!("Log sink thread panicked")),
            &output,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Failed to process in.txt");

        let err = prefer_run_error(Ok(()), Err(anyhow::anyhow!("Log sink thread panicked")), &output)
            .unwrap_err();
        assert_eq!(err.to_string(), "Log sink thread panicked");
        assert!(prefer_run_error(Ok(()), Ok(()), &output).is_ok());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("encryption"), "Encryption");
        assert_eq!(capitalize(""), "");
    }
}
