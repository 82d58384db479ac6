use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, KeyCode, KeyEvent, KeyEventKind};

use crate::games::{Key, KeyInput};

pub enum Event {
    Key(KeyEvent),
    Tick,
}

pub struct EventHandler {
    rx: mpsc::Receiver<Event>,
}

impl EventHandler {
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::channel();
        let tick_rate = Duration::from_millis(tick_rate_ms.max(1));

        thread::spawn(move || {
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate.saturating_sub(last_tick.elapsed());
                if event::poll(timeout).unwrap_or(false) {
                    if let Ok(crossterm::event::Event::Key(key)) = event::read() {
                        if tx.send(Event::Key(key)).is_err() {
                            return;
                        }
                    }
                }
                // Held keys must not starve the clock.
                if last_tick.elapsed() >= tick_rate {
                    last_tick = Instant::now();
                    if tx.send(Event::Tick).is_err() {
                        return;
                    }
                }
            }
        });

        Self { rx }
    }

    pub fn next(&self) -> io::Result<Event> {
        self.rx
            .recv()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

/// Translate a terminal key event into game input. Auto-repeat counts as a
/// press; keys no game listens to map to `None`.
pub fn key_input(key: &KeyEvent) -> Option<KeyInput> {
    let mapped = match key.code {
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char(c) => Key::Char(c.to_ascii_lowercase()),
        _ => return None,
    };
    if key.kind == KeyEventKind::Release {
        Some(KeyInput::release(mapped))
    } else {
        Some(KeyInput::press(mapped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventState, KeyModifiers};

    fn event(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_arrows_and_space_map() {
        assert_eq!(
            key_input(&event(KeyCode::Left, KeyEventKind::Press)),
            Some(KeyInput::press(Key::Left))
        );
        assert_eq!(
            key_input(&event(KeyCode::Char(' '), KeyEventKind::Press)),
            Some(KeyInput::press(Key::Space))
        );
        assert_eq!(
            key_input(&event(KeyCode::Char('X'), KeyEventKind::Press)),
            Some(KeyInput::press(Key::Char('x')))
        );
    }

    #[test]
    fn test_release_and_repeat() {
        assert_eq!(
            key_input(&event(KeyCode::Right, KeyEventKind::Release)),
            Some(KeyInput::release(Key::Right))
        );
        assert_eq!(
            key_input(&event(KeyCode::Right, KeyEventKind::Repeat)),
            Some(KeyInput::press(Key::Right))
        );
    }

    #[test]
    fn test_unused_keys_ignored() {
        assert_eq!(key_input(&event(KeyCode::Enter, KeyEventKind::Press)), None);
        assert_eq!(key_input(&event(KeyCode::F(1), KeyEventKind::Press)), None);
    }
}
