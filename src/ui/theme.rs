//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::RiskTier;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for titles and the concentration series.
    pub highlight: Color,
    /// Color for Low readings.
    pub low: Color,
    /// Color for Medium readings and the Medium threshold line.
    pub medium: Color,
    /// Color for High readings and the High threshold line.
    pub high: Color,
    /// Color for borders, axes and separators.
    pub border: Color,
    /// Style for panel titles.
    pub header: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            low: Color::Green,
            medium: Color::Yellow,
            high: Color::Red,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            low: Color::Green,
            medium: Color::Yellow,
            high: Color::Red,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Get style for a risk tier
    pub fn risk_style(&self, tier: RiskTier) -> Style {
        match tier {
            RiskTier::Low => Style::default().fg(self.low),
            RiskTier::Medium => Style::default().fg(self.medium),
            RiskTier::High => Style::default().fg(self.high).add_modifier(Modifier::BOLD),
        }
    }
}
