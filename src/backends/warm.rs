//! Cache warming backend
//!
//! Each target goes through three strictly sequential phases:
//!
//! 1. scan: walk the tree once, counting files and summing their lengths
//! 2. warm: walk it again and read every file to the end through a fixed
//!    buffer, updating the progress bar after every read call
//! 3. summarize: final full bar plus size, elapsed time and throughput
//!
//! A file that cannot be opened or read is skipped with a warning and its
//! length is removed from the expected total.

use anyhow::Result;
use colored::Colorize;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::backends::clear::CacheClearer;
use crate::core::model::{FileEntry, Target, WarmRunState, WarmSummary};
use crate::core::paths::FileSet;
use crate::core::render::{LineWidth, ProgressReporter};
use crate::core::util::{bytes_to_gb, bytes_to_mb, throughput_mb_s, MIB};
use crate::error::WarmError;

/// Default read buffer size (8 MiB)
pub const DEFAULT_BUFFER_SIZE: usize = 8 * MIB as usize;

/// Options for a warming run
#[derive(Debug, Clone)]
pub struct WarmOptions {
    /// Size of the read buffer in bytes
    pub buffer_size: usize,

    /// Width of the progress line
    pub width: LineWidth,

    /// Suppress the progress animation
    pub quiet: bool,
}

impl Default for WarmOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            width: LineWidth::Terminal,
            quiet: false,
        }
    }
}

type Opener = fn(&Path) -> io::Result<Box<dyn Read>>;

/// Open a file for a single sequential pass
pub fn open_for_warming(path: &Path) -> io::Result<File> {
    let file = File::open(path)?;
    fadvise_sequential(&file);
    Ok(file)
}

fn open_reader(path: &Path) -> io::Result<Box<dyn Read>> {
    Ok(Box::new(open_for_warming(path)?))
}

/// Hint the kernel to use aggressive readahead for the file.
#[cfg(target_os = "linux")]
fn fadvise_sequential(file: &File) {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor stays open for the duration of the call
    let rc = unsafe { libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_SEQUENTIAL) };
    if rc != 0 {
        debug!(errno = rc, "posix_fadvise failed");
    }
}

#[cfg(not(target_os = "linux"))]
fn fadvise_sequential(_file: &File) {}

/// Why a drain stopped early
#[derive(Debug)]
enum DrainError {
    /// Reading the file failed
    Source(io::Error),
    /// Writing progress to the console failed
    Sink(io::Error),
}

/// Read `reader` to the end through `buffer`, discarding the data.
/// `on_chunk` runs after every read call with the number of bytes read.
fn drain<R, F>(reader: &mut R, buffer: &mut [u8], mut on_chunk: F) -> Result<(), DrainError>
where
    R: Read,
    F: FnMut(usize) -> io::Result<()>,
{
    loop {
        let n = match reader.read(buffer) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(DrainError::Source(e)),
        };
        on_chunk(n).map_err(DrainError::Sink)?;
        if n == 0 {
            return Ok(());
        }
    }
}

/// Drives the scan and warm passes for one target at a time
pub struct CacheWarmer {
    buffer: Vec<u8>,
    reporter: ProgressReporter,
    opener: Opener,
}

impl CacheWarmer {
    pub fn new(options: &WarmOptions) -> Self {
        Self {
            buffer: vec![0u8; options.buffer_size.max(1)],
            reporter: ProgressReporter::new(options.width, options.quiet),
            opener: open_reader,
        }
    }

    #[cfg(test)]
    fn with_opener(mut self, opener: Opener) -> Self {
        self.opener = opener;
        self
    }

    /// Scan pass: count files and sum their lengths without reading them
    pub fn scan<W: Write>(&self, out: &mut W, set: &FileSet) -> io::Result<WarmRunState> {
        write!(out, "Analyzing {} ... ", set.root().display())?;
        out.flush()?;

        let mut state = WarmRunState::default();
        let mut errors = Vec::new();
        for item in set {
            match item {
                Ok(entry) => state.add_scanned(&entry),
                Err(err) => errors.push(err),
            }
        }

        writeln!(
            out,
            "Total: {} files, {:.2} GB",
            state.file_count,
            bytes_to_gb(state.total_bytes_expected)
        )?;
        for err in &errors {
            debug!(error = ?err, "enumeration error");
            writeln!(out, "{}", format!("Warning: {} (skipped)", err).as_str().yellow())?;
        }

        Ok(state)
    }

    /// Run all three phases for one target
    pub fn warm<W: Write>(&mut self, out: &mut W, target: &Target) -> io::Result<WarmSummary> {
        let set = FileSet::for_target(target);
        let scan_started = Instant::now();
        let mut state = self.scan(out, &set)?;
        info!(
            path = %set.root().display(),
            files = state.file_count,
            bytes = state.total_bytes_expected,
            elapsed_ms = scan_started.elapsed().as_millis() as u64,
            "scan complete"
        );

        writeln!(out, "Caching files in RAM...")?;
        let start = Instant::now();
        self.reporter.reset(start);

        for item in &set {
            match item {
                Ok(entry) => self.warm_file(out, &entry, &mut state)?,
                // already reported by the scan pass
                Err(err) => debug!(error = ?err, "enumeration error during warm pass"),
            }
        }

        let elapsed = start.elapsed();
        self.reporter.finish(out)?;
        writeln!(
            out,
            "Done {:.2} GB ({:.1} MB) in {:.1} seconds => {:.1} MB/s.",
            bytes_to_gb(state.total_bytes_expected),
            bytes_to_mb(state.total_bytes_expected),
            elapsed.as_secs_f64(),
            throughput_mb_s(state.total_bytes_expected, elapsed)
        )?;
        writeln!(out)?;

        info!(
            path = %set.root().display(),
            bytes_read = state.bytes_read,
            skipped = state.skipped.len(),
            frames = self.reporter.frames(),
            elapsed_ms = elapsed.as_millis() as u64,
            "warm complete"
        );

        Ok(WarmSummary::from_state(set.root(), state, elapsed))
    }

    /// Read one file to the end. Open and read failures skip the file;
    /// only console write failures are returned.
    fn warm_file<W: Write>(
        &mut self,
        out: &mut W,
        entry: &FileEntry,
        state: &mut WarmRunState,
    ) -> io::Result<()> {
        let Self {
            buffer,
            reporter,
            opener,
        } = self;
        let mut read_here = 0u64;

        let result = match (*opener)(&entry.path) {
            Ok(mut reader) => drain(&mut reader, buffer, |n| {
                read_here += n as u64;
                state.add_read(n);
                reporter.update(&mut *out, &*state).map(|_| ())
            }),
            Err(e) => Err(DrainError::Source(e)),
        };

        match result {
            Ok(()) => Ok(()),
            Err(DrainError::Sink(e)) => Err(e),
            Err(DrainError::Source(source)) => {
                state.skip(entry, read_here);
                let err = WarmError::Read {
                    path: entry.path.clone(),
                    source,
                };
                debug!(error = %err, len = entry.len, "file skipped");
                reporter.interrupt(out)?;
                let message = format!("Error while reading {} (skipped)", entry.path.display());
                writeln!(out, "{}", message.as_str().red())
            }
        }
    }
}

/// Run the clear step (if requested) and warm every target in order
pub fn run_warm<W, C>(
    out: &mut W,
    targets: &[Target],
    options: &WarmOptions,
    clearer: Option<&C>,
) -> Result<Vec<WarmSummary>>
where
    W: Write,
    C: CacheClearer + ?Sized,
{
    if let Some(clearer) = clearer {
        write!(out, "Clearing cache... ")?;
        out.flush()?;
        match clearer.clear() {
            Ok(()) => {
                info!("file cache cleared");
                writeln!(out, "Done.")?;
            }
            Err(err) => {
                debug!(error = %err, "cache clear failed");
                let message = format!("{}. Skipped.", err.short_reason());
                writeln!(out, "{}", message.as_str().red())?;
            }
        }
    }

    let mut warmer = CacheWarmer::new(options);
    let mut summaries = Vec::with_capacity(targets.len());
    for target in targets {
        summaries.push(warmer.warm(out, target)?);
    }
    Ok(summaries)
}
