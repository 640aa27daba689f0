//! CLI module - Command-line interface definitions and handlers

use anyhow::Result;
use clap::Parser;
use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::path::Path;

use crate::backends::clear::SystemCacheClearer;
use crate::backends::warm::{run_warm, WarmOptions};
use crate::core::model::Target;
use crate::core::render::LineWidth;
use crate::core::util::MIB;
use crate::error::WarmError;

/// cachewarm - read files and directory trees so the OS keeps them in RAM.
#[derive(Parser, Debug)]
#[command(name = "cachewarm")]
#[command(
    author,
    version,
    about,
    override_usage = "cachewarm [OPTIONS] <PATH>...",
    long_about = r#"The listed files or directories are read in full so that the operating
system keeps their contents in its file cache (as long as there is enough RAM).

Each PATH is processed in order: first its files are counted and sized, then
every file is read sequentially while a progress bar shows the throughput.
Files that cannot be read are skipped with a warning.

Examples:
    cachewarm ~/datasets/train
    cachewarm --clear_cache /srv/db/base /srv/db/index.bin
    cachewarm -q --buffer-size 32 /var/lib/images
"#
)]
pub struct Cli {
    /// Files or directories to read into the cache.
    #[arg(
        value_name = "PATH",
        required = true,
        num_args = 1..,
        value_parser = parse_target,
        long_help = "Files or directories to read into the cache.\n\n\
Each PATH must be an existing file or directory; otherwise nothing is read and\n\
the command exits with a usage hint."
    )]
    pub targets: Vec<Target>,

    /// Clear the OS file cache before caching the listed paths.
    #[arg(
        short = 'c',
        long = "clear_cache",
        visible_alias = "clear-cache",
        long_help = "Clear the OS file cache before caching the listed paths.\n\n\
This usually needs administrator rights. If clearing fails a warning is printed\n\
and the paths are cached anyway."
    )]
    pub clear_cache: bool,

    /// Wait for a key press before exiting.
    #[arg(
        short = 'w',
        long = "wait_input",
        visible_alias = "wait-input",
        long_help = "Wait for a key press before exiting, including after errors and --help.\n\
Useful when the tool runs in a console window that closes on exit."
    )]
    pub wait_input: bool,

    /// Read buffer size in MiB.
    #[arg(
        long,
        env = "CACHEWARM_BUFFER_MB",
        default_value_t = 8,
        value_name = "MIB",
        value_parser = clap::value_parser!(u64).range(1..=1024),
        long_help = "Size of the read buffer in MiB (1-1024, default 8).\n\n\
Can also be set with the CACHEWARM_BUFFER_MB environment variable."
    )]
    pub buffer_size: u64,

    /// Progress line width in columns (defaults to the terminal width).
    #[arg(
        long,
        value_name = "COLS",
        value_parser = clap::value_parser!(u16).range(10..),
        long_help = "Width of the progress line in columns.\n\n\
Defaults to the terminal width, or 80 columns when the output is not a terminal."
    )]
    pub width: Option<u16>,

    /// Disable colored output.
    #[arg(
        long,
        long_help = "Disable colored warnings. This is useful when piping to files or when your\n\
terminal does not support ANSI colors."
    )]
    pub no_color: bool,

    /// Quiet mode (no progress animation).
    #[arg(
        short,
        long,
        long_help = "Do not draw the progress bar. Size summaries, warnings and the final\n\
throughput line are still printed."
    )]
    pub quiet: bool,

    /// Verbose mode (more diagnostics).
    #[arg(
        short,
        long,
        long_help = "Enable debug diagnostics on stderr (skipped files with their OS error,\n\
pass timings, cache clear outcome). RUST_LOG overrides this."
    )]
    pub verbose: bool,
}

/// Resolve a positional argument into a [`Target`]
fn parse_target(s: &str) -> Result<Target, WarmError> {
    Target::resolve(Path::new(s))
}

/// Whether the raw arguments ask for --wait_input.
///
/// Used when clap rejects the command line (or prints help) so the console
/// window still stays open.
pub fn wait_requested<I>(args: I) -> bool
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter().skip(1).any(|arg| {
        let Some(arg) = arg.to_str() else {
            return false;
        };
        match arg {
            "--wait_input" | "--wait-input" => true,
            _ => {
                arg.starts_with('-')
                    && !arg.starts_with("--")
                    && arg[1..].chars().all(|c| c.is_ascii_alphabetic())
                    && arg.contains('w')
            }
        }
    })
}

/// Block until a key is pressed (or a line is entered when stdin is not a
/// terminal).
pub fn wait_for_key() -> Result<()> {
    use crossterm::event::{self, Event, KeyEventKind};
    use crossterm::terminal;

    print!("Press any key to exit...");
    io::stdout().flush()?;

    if io::stdin().is_terminal() && terminal::enable_raw_mode().is_ok() {
        let result = loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => break Ok(()),
                Ok(_) => continue,
                Err(e) => break Err(e),
            }
        };
        terminal::disable_raw_mode()?;
        println!();
        result?;
    } else {
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
    }
    Ok(())
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let options = WarmOptions {
        buffer_size: (cli.buffer_size * MIB) as usize,
        width: cli
            .width
            .map_or(LineWidth::Terminal, |w| LineWidth::Fixed(w as usize)),
        quiet: cli.quiet,
    };

    let clearer = SystemCacheClearer;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let summaries = run_warm(
        &mut out,
        &cli.targets,
        &options,
        cli.clear_cache.then_some(&clearer),
    )?;

    for summary in &summaries {
        tracing::debug!(
            path = %summary.target.display(),
            files = summary.file_count,
            expected = summary.total_bytes,
            read = summary.bytes_read,
            skipped = summary.skipped.len(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "target summary"
        );
    }
    Ok(())
}
