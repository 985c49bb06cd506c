//! Common UI components.
//!
//! This module contains the header bar, the latest-reading panel, the status
//! bar and the help overlay.

use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::duration::format_clock;
use crate::view::HIGH_RISK_WARNING;

/// Render the header bar.
///
/// Displays: risk indicator, location, sensor, time remaining.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let (icon_style, tier) = match &app.latest {
        Some(reading) => (
            app.theme.risk_style(reading.risk_tier()),
            reading.risk_tier().label(),
        ),
        None => (Style::default().add_modifier(Modifier::DIM), "Waiting"),
    };

    let remaining = app
        .remaining(Utc::now())
        .map(format_clock)
        .unwrap_or_else(|| "--:--".to_string());

    let line = Line::from(vec![
        Span::styled(" ● ", icon_style),
        Span::styled("FIBERWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(app.location.clone(), app.theme.header),
        Span::raw(" │ "),
        Span::styled(tier, icon_style),
        Span::raw(" │ "),
        Span::raw(format!("{} left", remaining)),
        Span::raw(" │ "),
        Span::styled(app.sensor.clone(), Style::default().add_modifier(Modifier::DIM)),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status block of the latest reading.
pub fn render_latest(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Latest reading ")
        .title_style(app.theme.header)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let lines = match &app.latest {
        Some(reading) => {
            let style = app.theme.risk_style(reading.risk_tier());
            let mut lines = vec![
                Line::from(format!(
                    "Time: {}",
                    reading
                        .timestamp()
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M:%S")
                )),
                Line::from(format!("Concentration: {:.4} f/cc", reading.concentration())),
                Line::from(vec![
                    Span::raw("Risk Level: "),
                    Span::styled(reading.risk_tier().label(), style),
                ]),
            ];
            if reading.is_high_risk() {
                lines.push(Line::from(Span::styled(HIGH_RISK_WARNING, style)));
            }
            lines
        }
        None => vec![Line::from(Span::styled(
            "Waiting for first sample...",
            Style::default().add_modifier(Modifier::DIM),
        ))],
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Render the status bar at the bottom.
///
/// Shows temporary notices first, otherwise reading counts and controls.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.medium));
        frame.render_widget(paragraph, area);
        return;
    }

    let status = format!(
        " {} readings | {} high | store: {} | ?:help q:quit",
        app.readings, app.high_risk, app.store
    );
    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Render the help overlay.
///
/// Displayed as a centered modal on top of the chart.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from("  ?         Toggle this help"),
        Line::from("  q / Esc   Stop monitoring"),
        Line::from("  Ctrl+C    Stop monitoring"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Thresholds",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(vec![
            Span::styled("  Medium", app.theme.risk_style(crate::data::RiskTier::Medium)),
            Span::raw(format!("    ≥ {} f/cc", crate::data::MEDIUM_THRESHOLD)),
        ]),
        Line::from(vec![
            Span::styled("  High", app.theme.risk_style(crate::data::RiskTier::High)),
            Span::raw(format!("      ≥ {} f/cc", crate::data::HIGH_THRESHOLD)),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press ? to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 36u16.min(area.width.saturating_sub(4));
    let help_height = 13u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
