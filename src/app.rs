//! Dashboard state behind the terminal view.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::data::Reading;
use crate::session::SessionInfo;
use crate::ui::Theme;
use crate::view::{PlotFrame, ViewWindow};

/// How long an operator notice stays in the status bar.
const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Display state of the live dashboard.
///
/// Holds only what the screen needs: the latest reading, a few counters and
/// the current plot frame. The session's buffer is never retained.
pub struct App {
    pub location: String,
    pub sensor: String,
    pub store: String,
    pub planned_end: Option<DateTime<Utc>>,

    pub latest: Option<Reading>,
    pub readings: usize,
    pub high_risk: usize,
    pub frame: PlotFrame,
    window: ViewWindow,

    pub show_help: bool,
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(mut window: ViewWindow, theme: Theme) -> Self {
        let frame = window.update(&[]);
        Self {
            location: String::new(),
            sensor: String::new(),
            store: String::new(),
            planned_end: None,
            latest: None,
            readings: 0,
            high_risk: 0,
            frame,
            window,
            show_help: false,
            theme,
            status_message: None,
        }
    }

    /// Take over the static facts of a starting session.
    pub fn begin(&mut self, session: &SessionInfo) {
        self.location = session.location.clone();
        self.sensor = session.sensor.clone();
        self.store = session.store.clone();
        self.planned_end = Some(session.planned_end);
    }

    /// Recompute display state from a buffer snapshot.
    pub fn update(&mut self, snapshot: &[Reading]) {
        self.frame = self.window.update(snapshot);
        self.readings = snapshot.len();
        self.latest = snapshot.last().cloned();
    }

    /// Record the reading just taken.
    pub fn record(&mut self, reading: &Reading) {
        if reading.is_high_risk() {
            self.high_risk += 1;
        }
        self.latest = Some(reading.clone());
    }

    /// Time left until the planned end, if a session has started.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let end = self.planned_end?;
        Some((end - now).to_std().unwrap_or(Duration::ZERO))
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < NOTICE_TTL {
                return Some(msg);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SessionBuffer;

    fn info(planned_end: DateTime<Utc>) -> SessionInfo {
        SessionInfo {
            location: "Plant room".to_string(),
            started_at: Utc::now(),
            planned_end,
            tick_period: Duration::from_secs(5),
            sensor: "simulated".to_string(),
            store: "memory".to_string(),
        }
    }

    #[test]
    fn test_update_tracks_latest_and_counts() {
        let mut app = App::new(ViewWindow::default(), Theme::dark());
        let mut buffer = SessionBuffer::new();
        buffer.push(Utc::now(), "Plant room", 0.02);
        let high = buffer.push(Utc::now(), "Plant room", 0.3).clone();

        app.update(buffer.readings());
        app.record(&high);

        assert_eq!(app.readings, 2);
        assert_eq!(app.high_risk, 1);
        assert_eq!(app.latest.as_ref().map(Reading::sequence_index), Some(2));
        assert!(app.frame.y_bounds[1] > 0.3);
    }

    #[test]
    fn test_remaining_saturates_at_zero() {
        let mut app = App::new(ViewWindow::default(), Theme::dark());
        assert_eq!(app.remaining(Utc::now()), None);

        let end = Utc::now();
        app.begin(&info(end));
        assert_eq!(app.location, "Plant room");
        assert_eq!(
            app.remaining(end - chrono::Duration::seconds(90)),
            Some(Duration::from_secs(90))
        );
        assert_eq!(app.remaining(end + chrono::Duration::seconds(5)), Some(Duration::ZERO));
    }

    #[test]
    fn test_status_message_is_visible() {
        let mut app = App::new(ViewWindow::default(), Theme::dark());
        assert!(app.get_status_message().is_none());
        app.set_status_message("Storage write failed".to_string());
        assert_eq!(app.get_status_message(), Some("Storage write failed"));
    }
}
