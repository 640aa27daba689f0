//! cachewarm - pre-load files and directory trees into the OS file cache
//!
//! cachewarm provides:
//! - Recursive expansion of file/directory arguments
//! - A two-pass warm: size scan, then full sequential reads
//! - A rate-limited, in-place progress bar with throughput
//! - Optional clearing of the OS file cache beforehand

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod backends;
mod cli;
mod core;
mod error;

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "cachewarm=debug"
    } else {
        "cachewarm=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn wait_if(requested: bool) {
    if requested {
        if let Err(e) = cli::wait_for_key() {
            eprintln!("Error: {:#}", e);
        }
    }
}

fn main() -> ExitCode {
    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // prints help/version to stdout, usage errors to stderr
            let _ = e.print();
            wait_if(cli::wait_requested(std::env::args_os()));
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    init_tracing(cli.verbose);
    let wait_input = cli.wait_input;

    let code = match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    };

    wait_if(wait_input);
    code
}
