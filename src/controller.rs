use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode};

use crate::domain::{Message, RosterConfig, RosterError};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &RosterConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Polls for one terminal event. The timeout doubles as the tick rate:
    /// returning None lets the run loop poll the debounce state even when
    /// the user is idle.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, RosterError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::MoveBeginning),
            KeyCode::Char('G') | KeyCode::End => Some(Message::MoveEnd),
            KeyCode::Char('/') => Some(Message::EditFilter),
            KeyCode::Tab => Some(Message::NextFilter),
            KeyCode::Char('c') => Some(Message::ClearFilters),
            KeyCode::Char('y') => Some(Message::CopyRow),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
