use clap::Parser;
use shiftpipe::cli::{Cli, Output};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(cli.verbose > 0, cli.quiet);

    match cli.run(&output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.error(&format!("Error: {e:#}"));
            ExitCode::FAILURE
        }
    }
}
