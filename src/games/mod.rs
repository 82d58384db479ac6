pub mod invaders;
pub mod pong;
pub mod scheduler;
pub mod session;
pub mod snake;
pub mod tetris;

use std::fmt;
use std::time::Duration;

use ratatui::prelude::*;
use serde::{Deserialize, Serialize};

use invaders::Invaders;
use pong::Pong;
use snake::Snake;
use tetris::Tetris;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameId {
    Snake,
    Tetris,
    Pong,
    Invaders,
}

impl GameId {
    pub fn all() -> &'static [GameId] {
        &[GameId::Snake, GameId::Tetris, GameId::Pong, GameId::Invaders]
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameId::Snake => "snake",
            GameId::Tetris => "tetris",
            GameId::Pong => "pong",
            GameId::Invaders => "invaders",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GameId::Snake => " Snake ",
            GameId::Tetris => " Tetris ",
            GameId::Pong => " Pong ",
            GameId::Invaders => " Space Invaders ",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GameId::Snake => "Classic snake game. Eat food, grow longer, don't hit walls!",
            GameId::Tetris => "The original block stacking game",
            GameId::Pong => "Paddle duel against the CPU",
            GameId::Invaders => "Defend Earth from the marching aliens",
        }
    }

    pub fn parse(name: &str) -> Option<GameId> {
        match name.trim().to_lowercase().as_str() {
            "snake" => Some(GameId::Snake),
            "tetris" => Some(GameId::Tetris),
            "pong" => Some(GameId::Pong),
            "invaders" | "spaceinvaders" | "space-invaders" => Some(GameId::Invaders),
            _ => None,
        }
    }

    /// Pong has no terminal state; its session only ends when the player leaves.
    pub fn is_endless(&self) -> bool {
        matches!(self, GameId::Pong)
    }

    pub fn launch(&self, seed: u64) -> Box<dyn Game> {
        match self {
            GameId::Snake => Box::new(Snake::with_seed(seed)),
            GameId::Tetris => Box::new(Tetris::with_seed(seed)),
            GameId::Pong => Box::new(Pong::with_seed(seed)),
            GameId::Invaders => Box::new(Invaders::with_seed(seed)),
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Countdown,
    Playing,
    GameOver,
    Won,
    Lost,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::GameOver | Phase::Won | Phase::Lost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Space,
    Char(char),
}

/// A single key transition. `pressed` is false for key-up, which only arrives
/// on terminals that report release events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub pressed: bool,
}

impl KeyInput {
    pub fn press(key: Key) -> Self {
        Self { key, pressed: true }
    }

    pub fn release(key: Key) -> Self {
        Self { key, pressed: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    ScoreChanged(u32),
    Finished { score: u32 },
}

pub trait Game {
    /// One simulation step. Does nothing outside of `Phase::Playing`.
    fn tick(&mut self);
    fn handle_input(&mut self, input: KeyInput);
    /// Leave the countdown and begin play.
    fn start(&mut self);
    fn phase(&self) -> Phase;
    fn score(&self) -> u32;
    fn tick_period(&self) -> Duration;
    fn countdown(&self) -> Duration;
    fn drain_events(&mut self) -> Vec<GameEvent>;
    fn render(&self, frame: &mut Frame, area: Rect);

    fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }
}
