//! Derived display window for the live chart.
//!
//! Keeps the view-local state the chart needs: which slice of time is
//! visible and how tall the concentration axis is. None of this feeds back
//! into the session.

use std::time::Duration;

use crate::data::Reading;

/// Extra seconds shown to the right of the newest point.
const LEAD_SECONDS: f64 = 5.0;

/// Visible time window and auto-growing concentration axis.
#[derive(Debug, Clone)]
pub struct ViewWindow {
    window: Duration,
    y_margin: f64,
    y_max: f64,
    x_bounds: [f64; 2],
}

/// Points and axis bounds to draw for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotFrame {
    /// (seconds since first reading, concentration) for the visible readings.
    pub points: Vec<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl Default for ViewWindow {
    fn default() -> Self {
        Self::new(Duration::from_secs(60), 1.1, 0.15)
    }
}

impl ViewWindow {
    pub fn new(window: Duration, y_margin: f64, initial_y_max: f64) -> Self {
        Self {
            window,
            y_margin: y_margin.max(1.0),
            y_max: initial_y_max,
            x_bounds: [0.0, window.as_secs_f64()],
        }
    }

    /// Current upper bound of the concentration axis.
    pub fn y_max(&self) -> f64 {
        self.y_max
    }

    /// Recompute the frame for a buffer snapshot.
    ///
    /// The y-axis only ever grows: once a reading exceeds the current bound,
    /// the bound becomes that maximum times the margin.
    pub fn update(&mut self, readings: &[Reading]) -> PlotFrame {
        let Some(first) = readings.first() else {
            return PlotFrame {
                points: Vec::new(),
                x_bounds: self.x_bounds,
                y_bounds: [0.0, self.y_max],
            };
        };

        let origin = first.timestamp();
        let elapsed = |r: &Reading| (r.timestamp() - origin).num_milliseconds() as f64 / 1000.0;

        let current = readings.last().map(elapsed).unwrap_or(0.0);
        let window = self.window.as_secs_f64();
        let start = (current - window).max(0.0);
        self.x_bounds = [start, current + LEAD_SECONDS];

        let max = readings.iter().map(Reading::concentration).fold(0.0, f64::max);
        if max > self.y_max {
            self.y_max = max * self.y_margin;
        }

        let points = readings
            .iter()
            .map(|r| (elapsed(r), r.concentration()))
            .filter(|(t, _)| *t >= start)
            .collect();

        PlotFrame {
            points,
            x_bounds: self.x_bounds,
            y_bounds: [0.0, self.y_max],
        }
    }
}
