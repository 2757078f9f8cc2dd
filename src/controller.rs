use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, TVConfig, XTVError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Waits up to the poll time for a terminal event and maps it to a message.
    /// Returning `None` still gives the model a tick to pick up finished imports.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, XTVError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(Self::handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Down | KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Up | KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Left | KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right | KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::Char('g') | KeyCode::Home, _) => Some(Message::MoveBeginning),
            (KeyCode::Char('G') | KeyCode::End, _) => Some(Message::MoveEnd),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('f'), _) => Some(Message::SearchInColumn),
            (KeyCode::Char('c'), _) => Some(Message::ClearFilters),
            (KeyCode::Char('o'), _) => Some(Message::Open),
            (KeyCode::Char('e'), _) => Some(Message::Export),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn key(code: KeyCode) -> Option<Message> {
        Controller::handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn maps_keys_to_messages() {
        assert!(matches!(key(KeyCode::Char('q')), Some(Message::Quit)));
        assert!(matches!(key(KeyCode::Char('/')), Some(Message::Search)));
        assert!(matches!(key(KeyCode::Char('f')), Some(Message::SearchInColumn)));
        assert!(matches!(key(KeyCode::Char('o')), Some(Message::Open)));
        assert!(matches!(key(KeyCode::Char('e')), Some(Message::Export)));
        assert!(matches!(key(KeyCode::Char('j')), Some(Message::MoveDown)));
        assert!(key(KeyCode::Char('z')).is_none());
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(matches!(Controller::handle_key(ctrl_c), Some(Message::Quit)));
    }
}
