use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::session::trainer::{InputSource, Response};

/// Map one terminal key event to a response; `None` for keys the trainer
/// ignores (releases, arrows, function keys).
pub fn response_for_key(key: KeyEvent) -> Option<Response> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Response::Exit);
    }
    match key.code {
        KeyCode::Esc => Some(Response::Exit),
        KeyCode::Char(ch) => Some(Response::Key(ch.to_ascii_uppercase())),
        _ => None,
    }
}

/// Blocking keyboard reader for a raw-mode terminal.
pub struct KeyInput;

impl InputSource for KeyInput {
    fn next_response(&mut self) -> Result<Response> {
        loop {
            if let Event::Key(key) = event::read()? {
                if let Some(response) = response_for_key(key) {
                    return Ok(response);
                }
            }
        }
    }
}
