//! Terminal UI rendering using ratatui.
//!
//! ## Submodules
//!
//! - [`chart`]: Live concentration chart with threshold lines
//! - [`common`]: Shared components (header, latest reading, status bar, help overlay)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ Chart (chart::render)                │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Latest reading (common::render_latest│
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//! ```
//!
//! The session drives redraws once per tick. A key listener thread (see
//! [`crate::events`]) shares the same [`Screen`] so help toggles and resizes
//! redraw immediately.

pub mod chart;
pub mod common;
pub mod theme;

pub use theme::Theme;

use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Frame, Terminal,
};
use tokio::sync::watch;

use crate::app::App;
use crate::data::Reading;
use crate::session::SessionInfo;
use crate::view::LiveView;

// Minimum terminal size for usable display
const MIN_WIDTH: u16 = 60;
const MIN_HEIGHT: u16 = 16;

/// Draw the whole dashboard.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = format!(
            "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
            area.width, area.height, MIN_WIDTH, MIN_HEIGHT
        );
        let paragraph = Paragraph::new(msg)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Yellow));
        let centered = Rect::new(0, (area.height / 2).saturating_sub(2), area.width, 5.min(area.height));
        frame.render_widget(paragraph, centered);
        return;
    }

    let chunks = Layout::vertical([
        Constraint::Length(1), // Header bar
        Constraint::Min(8),    // Chart
        Constraint::Length(6), // Latest reading
        Constraint::Length(1), // Status bar
    ])
    .split(area);

    common::render_header(frame, app, chunks[0]);
    chart::render(frame, app, chunks[1]);
    common::render_latest(frame, app, chunks[2]);
    common::render_status_bar(frame, app, chunks[3]);

    if app.show_help {
        common::render_help(frame, app, area);
    }
}

/// Terminal plus the dashboard state drawn on it.
pub struct Screen<B: Backend> {
    pub terminal: Terminal<B>,
    pub app: App,
}

impl<B: Backend> Screen<B> {
    pub fn redraw(&mut self) -> io::Result<()> {
        let app = &self.app;
        self.terminal.draw(|frame| draw(frame, app))?;
        Ok(())
    }
}

pub(crate) fn lock<B: Backend>(screen: &Mutex<Screen<B>>) -> MutexGuard<'_, Screen<B>> {
    screen.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Full-screen live chart.
pub struct TerminalView<B: Backend + Send + 'static = CrosstermBackend<Stdout>> {
    screen: Arc<Mutex<Screen<B>>>,
    stop: Arc<AtomicBool>,
    listener: Option<JoinHandle<()>>,
    raw: bool,
}

impl TerminalView<CrosstermBackend<Stdout>> {
    /// Take over the terminal and start listening for keys.
    ///
    /// Quit keys raise `shutdown`. The terminal is restored on [`LiveView::close`]
    /// and by a panic hook.
    pub fn enter(app: App, shutdown: Arc<watch::Sender<bool>>) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        // Setup panic hook to restore terminal
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(panic);
        }));

        let screen = Arc::new(Mutex::new(Screen { terminal, app }));
        let stop = Arc::new(AtomicBool::new(false));
        let listener =
            crate::events::spawn_listener(Arc::clone(&screen), shutdown, Arc::clone(&stop));

        Ok(Self {
            screen,
            stop,
            listener: Some(listener),
            raw: true,
        })
    }
}

impl<B: Backend + Send + 'static> TerminalView<B> {
    /// Draw on an existing terminal without touching terminal modes.
    pub fn with_terminal(terminal: Terminal<B>, app: App) -> Self {
        Self {
            screen: Arc::new(Mutex::new(Screen { terminal, app })),
            stop: Arc::new(AtomicBool::new(false)),
            listener: None,
            raw: false,
        }
    }

    /// Shared handle to the screen, for inspection.
    pub fn screen(&self) -> Arc<Mutex<Screen<B>>> {
        Arc::clone(&self.screen)
    }

    fn restore(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(listener) = self.listener.take() {
            let _ = listener.join();
        }
        if self.raw {
            self.raw = false;
            disable_raw_mode()?;
            execute!(io::stdout(), LeaveAlternateScreen)?;
            lock(&self.screen).terminal.show_cursor()?;
        }
        Ok(())
    }
}

impl<B: Backend + Send + 'static> LiveView for TerminalView<B> {
    fn begin(&mut self, session: &SessionInfo) {
        let mut screen = lock(&self.screen);
        screen.app.begin(session);
        let _ = screen.redraw();
    }

    fn render(&mut self, snapshot: &[Reading]) -> Result<()> {
        let mut screen = lock(&self.screen);
        screen.app.update(snapshot);
        screen.redraw()?;
        Ok(())
    }

    fn status(&mut self, reading: &Reading) {
        let mut screen = lock(&self.screen);
        screen.app.record(reading);
        let _ = screen.redraw();
    }

    fn notice(&mut self, message: &str) {
        let mut screen = lock(&self.screen);
        screen.app.set_status_message(message.to_string());
        let _ = screen.redraw();
    }

    fn close(&mut self) -> Result<()> {
        self.restore()
    }
}

impl<B: Backend + Send + 'static> Drop for TerminalView<B> {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SessionBuffer;
    use crate::view::ViewWindow;
    use chrono::Utc;
    use ratatui::backend::TestBackend;
    use std::time::Duration;

    fn view(width: u16, height: u16) -> TerminalView<TestBackend> {
        let terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        TerminalView::with_terminal(terminal, App::new(ViewWindow::default(), Theme::dark()))
    }

    fn screen_text(view: &TerminalView<TestBackend>) -> String {
        let screen = view.screen();
        let screen = screen.lock().unwrap();
        screen
            .terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn info() -> SessionInfo {
        SessionInfo {
            location: "Basement".to_string(),
            started_at: Utc::now(),
            planned_end: Utc::now() + chrono::Duration::minutes(10),
            tick_period: Duration::from_secs(5),
            sensor: "simulated".to_string(),
            store: "memory".to_string(),
        }
    }

    #[test]
    fn test_waiting_screen() {
        let mut view = view(100, 30);
        view.begin(&info());

        let text = screen_text(&view);
        assert!(text.contains("FIBERWATCH"));
        assert!(text.contains("Basement"));
        assert!(text.contains("Waiting for first sample"));
    }

    #[test]
    fn test_high_reading_is_flagged() {
        let mut view = view(100, 30);
        view.begin(&info());

        let mut buffer = SessionBuffer::new();
        buffer.push(Utc::now(), "Basement", 0.02);
        let reading = buffer.push(Utc::now(), "Basement", 0.25).clone();
        view.render(buffer.readings()).unwrap();
        view.status(&reading);

        let text = screen_text(&view);
        assert!(text.contains("Concentration: 0.2500 f/cc"));
        assert!(text.contains("Risk Level: High"));
        assert!(text.contains("WARNING: High Risk Level Detected!"));
        assert!(text.contains("2 readings | 1 high"));
        assert!(text.contains("Asbestos Fiber Concentration - Basement"));
        view.close().unwrap();
    }

    #[test]
    fn test_notice_replaces_status_bar() {
        let mut view = view(100, 30);
        view.notice("Invalid sample rejected: sensor returned -0.01 f/cc");

        let text = screen_text(&view);
        assert!(text.contains("Invalid sample rejected"));
        assert!(!text.contains("q:quit"));
    }

    #[test]
    fn test_small_terminal_message() {
        let mut view = view(40, 10);
        view.render(&[]).unwrap();
        assert!(screen_text(&view).contains("Terminal too small"));
    }

    #[test]
    fn test_help_overlay() {
        let mut view = view(100, 30);
        {
            let screen = view.screen();
            let mut screen = screen.lock().unwrap();
            screen.app.toggle_help();
            screen.redraw().unwrap();
        }
        assert!(screen_text(&view).contains("Keyboard Shortcuts"));
        view.close().unwrap();
    }
}
