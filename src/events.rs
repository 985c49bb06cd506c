//! Keyboard handling for the terminal view.
//!
//! Raw mode swallows Ctrl+C, so quitting is driven from here: a background
//! thread polls crossterm events and raises the session's shutdown signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::backend::Backend;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::app::App;
use crate::ui::{self, Screen};

/// What the listener should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Redraw,
    Ignore,
}

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> KeyAction {
    if key.kind == KeyEventKind::Release {
        return KeyAction::Ignore;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Char('q') | KeyCode::Esc => {
            // Esc first closes the help overlay
            if key.code == KeyCode::Esc && app.show_help {
                app.show_help = false;
                KeyAction::Redraw
            } else {
                KeyAction::Quit
            }
        }
        KeyCode::Char('?') => {
            app.toggle_help();
            KeyAction::Redraw
        }
        _ => KeyAction::Ignore,
    }
}

/// Spawn the key listener thread.
///
/// The thread exits when `stop` is set, when every shutdown receiver is
/// gone, or after a quit key has been forwarded.
pub fn spawn_listener<B: Backend + Send + 'static>(
    screen: Arc<Mutex<Screen<B>>>,
    shutdown: Arc<watch::Sender<bool>>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) && !shutdown.is_closed() {
            let event = match poll_event(Duration::from_millis(100)) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Key listener stopped: {}", e);
                    return;
                }
            };

            match event {
                Event::Key(key) => {
                    let mut screen = ui::lock(&screen);
                    match handle_key_event(&mut screen.app, key) {
                        KeyAction::Quit => {
                            info!("Stop requested from keyboard");
                            screen.app.set_status_message("Stopping...".to_string());
                            let _ = screen.redraw();
                            let _ = shutdown.send(true);
                            return;
                        }
                        KeyAction::Redraw => {
                            let _ = screen.redraw();
                        }
                        KeyAction::Ignore => {}
                    }
                }
                Event::Resize(_, _) => {
                    let _ = ui::lock(&screen).redraw();
                }
                _ => {}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::Theme;
    use crate::view::ViewWindow;

    fn app() -> App {
        App::new(ViewWindow::default(), Theme::dark())
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('q'))), KeyAction::Quit);
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Esc)), KeyAction::Quit);
        assert_eq!(
            handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyAction::Quit
        );
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('c'))), KeyAction::Ignore);
    }

    #[test]
    fn test_help_toggle_and_escape() {
        let mut app = app();
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('?'))), KeyAction::Redraw);
        assert!(app.show_help);

        // Esc closes help instead of quitting
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Esc)), KeyAction::Redraw);
        assert!(!app.show_help);
    }
}
