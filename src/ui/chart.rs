//! Live concentration chart.
//!
//! Plots the visible part of the session as a line, with the Medium and
//! High thresholds drawn as horizontal reference lines.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use crate::app::App;
use crate::data::{RiskTier, HIGH_THRESHOLD, MEDIUM_THRESHOLD};

/// Render the chart for the current plot frame.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let plot = &app.frame;
    let [x_start, x_end] = plot.x_bounds;
    let [y_start, y_end] = plot.y_bounds;

    let medium = [(x_start, MEDIUM_THRESHOLD), (x_end, MEDIUM_THRESHOLD)];
    let high = [(x_start, HIGH_THRESHOLD), (x_end, HIGH_THRESHOLD)];

    let datasets = vec![
        Dataset::default()
            .name("Concentration")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(app.theme.highlight))
            .data(&plot.points),
        Dataset::default()
            .name(format!("Medium ({})", MEDIUM_THRESHOLD))
            .marker(Marker::Dot)
            .graph_type(GraphType::Line)
            .style(app.theme.risk_style(RiskTier::Medium))
            .data(&medium),
        Dataset::default()
            .name(format!("High ({})", HIGH_THRESHOLD))
            .marker(Marker::Dot)
            .graph_type(GraphType::Line)
            .style(app.theme.risk_style(RiskTier::High))
            .data(&high),
    ];

    let axis_style = Style::default().fg(app.theme.border);
    let x_axis = Axis::default()
        .title(Span::styled("Time (s)", axis_style))
        .style(axis_style)
        .bounds(plot.x_bounds)
        .labels(vec![
            format!("{:.0}", x_start),
            format!("{:.0}", (x_start + x_end) / 2.0),
            format!("{:.0}", x_end),
        ]);
    let y_axis = Axis::default()
        .title(Span::styled("f/cc", axis_style))
        .style(axis_style)
        .bounds(plot.y_bounds)
        .labels(vec![
            format!("{:.3}", y_start),
            format!("{:.3}", (y_start + y_end) / 2.0),
            format!("{:.3}", y_end),
        ]);

    let block = Block::default()
        .title(format!(" Asbestos Fiber Concentration - {} ", app.location))
        .title_style(app.theme.header.add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let chart = Chart::new(datasets).block(block).x_axis(x_axis).y_axis(y_axis);

    frame.render_widget(chart, area);
}
