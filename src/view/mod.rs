//! Live presentation of a running session.
//!
//! The session pushes a read-only snapshot of its buffer to a [`LiveView`]
//! once per tick, followed by the status of the newest reading. Views keep
//! only derived display state (see [`ViewWindow`]) and never touch the
//! buffer itself.
//!
//! - [`ConsoleView`]: plain status blocks on a writer (stdout by default)
//! - [`NullView`]: discards everything
//! - [`crate::ui::TerminalView`]: full-screen ratatui chart

mod window;

pub use window::{PlotFrame, ViewWindow};

use std::io::{self, Stdout, Write};

use anyhow::{bail, Result};
use chrono::Local;
use tracing::warn;

use crate::data::Reading;
use crate::session::SessionInfo;

/// Marker printed with every High-risk reading.
pub const HIGH_RISK_WARNING: &str = "⚠ WARNING: High Risk Level Detected!";

/// A presentation surface driven by the session.
pub trait LiveView: Send {
    /// Called once before the first sample.
    fn begin(&mut self, _session: &SessionInfo) {}

    /// Redraw from the current buffer snapshot.
    fn render(&mut self, snapshot: &[Reading]) -> Result<()>;

    /// Show the status of the reading just recorded.
    fn status(&mut self, reading: &Reading);

    /// Show an operator-facing notice (rejected sample, failed write, ...).
    fn notice(&mut self, _message: &str) {}

    /// Release the display surface.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Human-readable status block for one reading.
pub fn status_lines(reading: &Reading) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Time: {}",
            reading.timestamp().with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
        format!("Location: {}", reading.location()),
        format!("Concentration: {:.4} f/cc", reading.concentration()),
        format!("Risk Level: {}", reading.risk_tier()),
    ];
    if reading.is_high_risk() {
        lines.push(HIGH_RISK_WARNING.to_string());
    }
    lines
}

/// A view that renders nothing.
#[derive(Debug, Default)]
pub struct NullView;

impl LiveView for NullView {
    fn render(&mut self, _snapshot: &[Reading]) -> Result<()> {
        Ok(())
    }

    fn status(&mut self, _reading: &Reading) {}
}

/// Headless view printing one status block per reading.
///
/// Output failures do not interrupt sampling. The first one is logged and
/// reported again by [`LiveView::close`].
#[derive(Debug)]
pub struct ConsoleView<W: Write + Send = Stdout> {
    out: W,
    write_error: Option<io::Error>,
}

impl ConsoleView<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            write_error: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.write_error.is_some() {
            return;
        }
        for line in lines {
            if let Err(e) = writeln!(self.out, "{}", line.as_ref()) {
                warn!("Console output failed, further status lines are dropped: {}", e);
                self.write_error = Some(e);
                return;
            }
        }
    }
}

impl<W: Write + Send> LiveView for ConsoleView<W> {
    fn begin(&mut self, session: &SessionInfo) {
        self.write_lines([
            format!("Starting real-time monitoring at {}", session.location),
            format!(
                "Planned end: {}",
                session.planned_end.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            ),
            "Press Ctrl+C to stop monitoring".to_string(),
            "-".repeat(50),
        ]);
    }

    fn render(&mut self, _snapshot: &[Reading]) -> Result<()> {
        // Status blocks are the whole presentation in console mode
        Ok(())
    }

    fn status(&mut self, reading: &Reading) {
        let mut lines = status_lines(reading);
        lines.push("-".repeat(50));
        self.write_lines(lines);
    }

    fn notice(&mut self, message: &str) {
        self.write_lines([message]);
    }

    fn close(&mut self) -> Result<()> {
        if let Some(ref e) = self.write_error {
            bail!("console output failed: {}", e);
        }
        self.out.flush()?;
        Ok(())
    }
}
