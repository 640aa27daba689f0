//! Progress rendering
//!
//! Draws a single-line, in-place progress bar followed by the instantaneous
//! throughput and a rotating indicator:
//!
//! ```text
//! [===============                    ] 412.3 MB/s /
//! ```
//!
//! Frames are rate limited: a new one is drawn only when at least
//! [`SAMPLE_INTERVAL`] has passed since the previous sample.

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::core::model::WarmRunState;
use crate::core::util::bytes_to_mb;

/// Minimum time between two frames
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Rotating indicator symbols
pub const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// Width used when the terminal size cannot be queried (e.g. piped output)
pub const FALLBACK_WIDTH: usize = 80;

/// Columns taken by the brackets plus one spare column so the line never wraps
const BAR_OVERHEAD: usize = 3;

/// Source of the line width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineWidth {
    #[default]
    Terminal,
    Fixed(usize),
}

impl LineWidth {
    pub fn columns(self) -> usize {
        match self {
            LineWidth::Fixed(n) => n,
            LineWidth::Terminal => crossterm::terminal::size()
                .map(|(w, _)| w as usize)
                .ok()
                .filter(|w| *w > 0)
                .unwrap_or(FALLBACK_WIDTH),
        }
    }
}

/// Number of '=' cells for a bar with `inner` cells at `ratio`
pub fn fill_width(inner: usize, ratio: f64) -> usize {
    let ratio = ratio.clamp(0.0, 1.0);
    let fill = (inner as f64 * ratio + 0.5).floor() as usize;
    fill.min(inner)
}

/// A rendered bar and the number of filled cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarFrame {
    pub text: String,
    pub fill: usize,
}

impl BarFrame {
    /// Build a bar that occupies `available` columns minus the overhead,
    /// with exactly `fill` cells filled (capped to the inner width).
    pub fn with_fill(available: usize, fill: usize) -> Self {
        let inner = inner_width(available);
        let fill = fill.min(inner);
        let mut text = String::with_capacity(inner + 2);
        text.push('[');
        text.extend(std::iter::repeat('=').take(fill));
        text.extend(std::iter::repeat(' ').take(inner - fill));
        text.push(']');
        Self { text, fill }
    }

    pub fn new(available: usize, ratio: f64) -> Self {
        Self::with_fill(available, fill_width(inner_width(available), ratio))
    }
}

fn inner_width(available: usize) -> usize {
    available.saturating_sub(BAR_OVERHEAD)
}

/// Rate-limited progress renderer for one target's warm pass
#[derive(Debug)]
pub struct ProgressReporter {
    width: LineWidth,
    quiet: bool,
    last_sample: Instant,
    last_bytes: u64,
    frame: usize,
    last_fill: usize,
    on_line: bool,
}

impl ProgressReporter {
    pub fn new(width: LineWidth, quiet: bool) -> Self {
        Self {
            width,
            quiet,
            last_sample: Instant::now(),
            last_bytes: 0,
            frame: 0,
            last_fill: 0,
            on_line: false,
        }
    }

    /// Start a new target: baselines move to `now` and zero bytes
    pub fn reset(&mut self, now: Instant) {
        self.last_sample = now;
        self.last_bytes = 0;
        self.frame = 0;
        self.last_fill = 0;
        self.on_line = false;
    }

    /// Number of frames drawn since the last reset
    pub fn frames(&self) -> usize {
        self.frame
    }

    /// Fill width of the most recent frame
    #[cfg(test)]
    pub fn last_fill(&self) -> usize {
        self.last_fill
    }

    pub fn update<W: Write>(&mut self, out: &mut W, state: &WarmRunState) -> io::Result<bool> {
        self.update_at(out, Instant::now(), state)
    }

    /// Take a sample and draw a frame if the sample interval has elapsed.
    /// Returns whether a sample was taken; quiet mode samples without drawing.
    pub fn update_at<W: Write>(
        &mut self,
        out: &mut W,
        now: Instant,
        state: &WarmRunState,
    ) -> io::Result<bool> {
        let elapsed = now.saturating_duration_since(self.last_sample);
        if elapsed < SAMPLE_INTERVAL {
            return Ok(false);
        }

        let delta = state.bytes_read.saturating_sub(self.last_bytes);
        let rate = bytes_to_mb(delta) / elapsed.as_secs_f64();
        let info = format!(" {:.1} MB/s {}", rate, SPINNER[self.frame % SPINNER.len()]);

        let available = self.width.columns().saturating_sub(info.len());
        let mut bar = BarFrame::new(available, state.ratio());
        // the bar never moves backwards within a target
        if bar.fill < self.last_fill {
            bar = BarFrame::with_fill(available, self.last_fill);
        }

        if !self.quiet {
            queue!(out, MoveToColumn(0), Print(&bar.text), Print(&info))?;
            out.flush()?;
            self.on_line = true;
            self.frame += 1;
        }

        self.last_fill = bar.fill;
        self.last_sample = now;
        self.last_bytes = state.bytes_read;
        Ok(true)
    }

    /// Clear the animated line so a message can be printed on its own line
    pub fn interrupt<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.on_line {
            queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
            out.flush()?;
            self.on_line = false;
        }
        Ok(())
    }

    /// Force a final, completely filled bar across the whole line
    pub fn finish<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let bar = BarFrame::new(self.width.columns(), 1.0);
        queue!(out, MoveToColumn(0), Print(&bar.text), Print("\n"))?;
        out.flush()?;
        self.last_fill = bar.fill;
        self.on_line = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(read: u64, expected: u64) -> WarmRunState {
        WarmRunState {
            total_bytes_expected: expected,
            bytes_read: read,
            ..Default::default()
        }
    }

    fn reporter(width: usize) -> (ProgressReporter, Instant) {
        let start = Instant::now();
        let mut r = ProgressReporter::new(LineWidth::Fixed(width), false);
        r.reset(start);
        (r, start)
    }

    #[test]
    fn test_fill_width_rounding() {
        assert_eq!(fill_width(10, 0.0), 0);
        assert_eq!(fill_width(10, 0.44), 4);
        assert_eq!(fill_width(10, 0.46), 5);
        assert_eq!(fill_width(10, 1.0), 10);
        assert_eq!(fill_width(10, 3.5), 10);
        assert_eq!(fill_width(10, -1.0), 0);
    }

    #[test]
    fn test_bar_frame_layout() {
        let bar = BarFrame::new(13, 0.5);
        assert_eq!(bar.text.len(), 12);
        assert_eq!(bar.fill, 5);
        assert_eq!(bar.text, "[=====     ]");
    }

    #[test]
    fn test_bar_frame_narrow_width() {
        let bar = BarFrame::new(2, 1.0);
        assert_eq!(bar.text, "[]");
    }

    #[test]
    fn test_no_frame_before_interval() {
        let (mut r, start) = reporter(60);
        let mut out = Vec::new();

        let drawn = r
            .update_at(&mut out, start + Duration::from_millis(499), &state(10, 100))
            .unwrap();
        assert!(!drawn);
        assert!(out.is_empty());
        assert_eq!(r.frames(), 0);
    }

    #[test]
    fn test_one_frame_per_interval() {
        let (mut r, start) = reporter(60);
        let mut out = Vec::new();

        let t1 = start + Duration::from_millis(500);
        assert!(r.update_at(&mut out, t1, &state(10, 100)).unwrap());
        assert_eq!(r.frames(), 1);

        // within the next half second nothing is drawn
        let len = out.len();
        assert!(!r
            .update_at(&mut out, t1 + Duration::from_millis(200), &state(20, 100))
            .unwrap());
        assert_eq!(out.len(), len);

        assert!(r
            .update_at(&mut out, t1 + Duration::from_millis(500), &state(30, 100))
            .unwrap());
        assert_eq!(r.frames(), 2);
    }

    #[test]
    fn test_frame_contains_rate_and_spinner() {
        let (mut r, start) = reporter(60);
        let mut out = Vec::new();

        let mb = 1024 * 1024;
        r.update_at(&mut out, start + Duration::from_secs(1), &state(5 * mb, 10 * mb))
            .unwrap();
        r.update_at(&mut out, start + Duration::from_secs(2), &state(7 * mb, 10 * mb))
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(" 5.0 MB/s |"));
        assert!(text.contains(" 2.0 MB/s /"));
    }

    #[test]
    fn test_fill_within_width_and_monotonic() {
        let width = 50;
        let (mut r, start) = reporter(width);
        let mut out = Vec::new();
        let mut previous = 0;

        let samples = [(0, 100), (30, 100), (30, 80), (70, 80), (80, 80), (90, 80)];
        for (i, (read, expected)) in samples.iter().enumerate() {
            let now = start + SAMPLE_INTERVAL * (i as u32 + 1);
            assert!(r.update_at(&mut out, now, &state(*read, *expected)).unwrap());
            assert!(r.last_fill() <= width);
            assert!(r.last_fill() >= previous);
            previous = r.last_fill();
        }
    }

    #[test]
    fn test_finish_draws_full_bar() {
        let (mut r, _) = reporter(20);
        let mut out = Vec::new();
        r.finish(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(&format!("[{}]\n", "=".repeat(17))));
        assert_eq!(r.last_fill(), 17);
    }

    #[test]
    fn test_quiet_draws_nothing_but_keeps_sampling() {
        let start = Instant::now();
        let mut r = ProgressReporter::new(LineWidth::Fixed(40), true);
        r.reset(start);
        let mut out = Vec::new();

        assert!(r
            .update_at(&mut out, start + SAMPLE_INTERVAL, &state(1, 2))
            .unwrap());
        r.finish(&mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(r.frames(), 0);
        assert!(r.last_fill() > 0);
    }

    #[test]
    fn test_reset_clears_baselines() {
        let (mut r, start) = reporter(40);
        let mut out = Vec::new();
        r.update_at(&mut out, start + SAMPLE_INTERVAL, &state(100, 100))
            .unwrap();
        assert!(r.last_fill() > 0);

        r.reset(start + SAMPLE_INTERVAL);
        assert_eq!(r.frames(), 0);
        assert_eq!(r.last_fill(), 0);
    }

    #[test]
    fn test_interrupt_only_after_frame() {
        let (mut r, start) = reporter(40);
        let mut out = Vec::new();
        r.interrupt(&mut out).unwrap();
        assert!(out.is_empty());

        r.update_at(&mut out, start + SAMPLE_INTERVAL, &state(1, 2))
            .unwrap();
        let len = out.len();
        r.interrupt(&mut out).unwrap();
        assert!(out.len() > len);
    }
}
