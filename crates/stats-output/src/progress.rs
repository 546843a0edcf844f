//! Single-line terminal progress bar for the per-day fetch.

use std::io::{self, Write};

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
    tty::IsTty,
};

use stats_core::formatting::{format_number, percentage};
use stats_data::fetcher::ProgressSink;

// ── ProgressBarConfig ────────────────────────────────────────────────────────

/// Configuration for the visual appearance of the progress bar.
#[derive(Debug, Clone)]
pub struct ProgressBarConfig {
    /// Width in terminal columns of the bar portion (excluding label).
    pub width: u16,
    pub filled_char: char,
    pub empty_char: char,
    /// Unit shown after the `done/total` counts.
    pub unit: &'static str,
}

impl Default for ProgressBarConfig {
    fn default() -> Self {
        Self {
            width: 40,
            filled_char: '\u{2588}', // █  FULL BLOCK
            empty_char: '\u{2591}',  // ░  LIGHT SHADE
            unit: "days",
        }
    }
}

/// Render one frame of the bar, e.g. `Fetching  50.0% ████░░░░ 2/4 days`.
pub fn render_line(config: &ProgressBarConfig, done: u64, total: u64) -> String {
    let pct = percentage(done.min(total) as f64, total as f64, 1);
    let filled = ((pct / 100.0) * config.width as f64) as usize;
    let empty = (config.width as usize).saturating_sub(filled);

    format!(
        "Fetching {:>5.1}% {}{} {}/{} {}",
        pct,
        config.filled_char.to_string().repeat(filled),
        config.empty_char.to_string().repeat(empty),
        format_number(done as f64, 0),
        format_number(total as f64, 0),
        config.unit,
    )
}

// ── TerminalProgress ─────────────────────────────────────────────────────────

/// [`ProgressSink`] that redraws a progress line on stderr.
///
/// Drawing is skipped when stderr is not a terminal so that redirected
/// output stays clean. Draw failures never abort the fetch. A bar dropped
/// before `finish` (a failed fetch) still ends its line, so the error
/// message starts on a fresh one.
pub struct TerminalProgress {
    config: ProgressBarConfig,
    total: u64,
    done: u64,
    enabled: bool,
    /// A frame is on screen without a trailing newline.
    line_open: bool,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::with_config(ProgressBarConfig::default())
    }

    pub fn with_config(config: ProgressBarConfig) -> Self {
        Self {
            config,
            total: 0,
            done: 0,
            enabled: io::stderr().is_tty(),
            line_open: false,
        }
    }

    pub fn done(&self) -> u64 {
        self.done
    }

    fn draw(&mut self) {
        if !self.enabled {
            return;
        }
        let line = render_line(&self.config, self.done, self.total);
        let mut stderr = io::stderr();
        let result = queue!(
            stderr,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        )
        .and_then(|_| stderr.flush());
        match result {
            Ok(()) => self.line_open = true,
            Err(e) => tracing::debug!("Progress bar draw failed: {}", e),
        }
    }

    /// Terminate the current frame with a newline, once.
    fn end_line<W: Write>(&mut self, out: &mut W) {
        if !self.line_open {
            return;
        }
        self.line_open = false;
        if let Err(e) = queue!(out, Print("\n")).and_then(|_| out.flush()) {
            tracing::debug!("Progress bar finish failed: {}", e);
        }
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalProgress {
    fn set_total(&mut self, total: u64) {
        self.total = total;
        self.done = 0;
        self.draw();
    }

    fn increment(&mut self, n: u64) {
        self.done = self.done.saturating_add(n);
        self.draw();
    }

    fn finish(&mut self) {
        self.end_line(&mut io::stderr());
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        self.end_line(&mut io::stderr());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
