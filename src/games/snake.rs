use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::{Game, GameEvent, GameId, Key, KeyInput, Phase};
use crate::ui::canvas::{game_block, Canvas};

pub const GRID_SIZE: i32 = 20;
const BASE_PERIOD_MS: u64 = 100;
const MIN_PERIOD_MS: u64 = 50;
const SPEED_STEP_MS: u64 = 1;
const COUNTDOWN_SECS: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn in_bounds(&self) -> bool {
        self.x >= 0 && self.x < GRID_SIZE && self.y >= 0 && self.y < GRID_SIZE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

pub struct Snake {
    /// Head first.
    body: Vec<Cell>,
    food: Cell,
    direction: Direction,
    score: u32,
    phase: Phase,
    events: Vec<GameEvent>,
    rng: StdRng,
}

impl Snake {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            body: vec![Cell::new(10, 10)],
            food: Cell::new(15, 15),
            direction: Direction::Right,
            score: 0,
            phase: Phase::Countdown,
            events: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[cfg(test)]
    fn body(&self) -> &[Cell] {
        &self.body
    }

    #[cfg(test)]
    fn food(&self) -> Cell {
        self.food
    }

    #[cfg(test)]
    fn direction(&self) -> Direction {
        self.direction
    }

    /// Latch a new heading. Reversal is judged against the latched heading, so
    /// it is rejected here rather than at tick time.
    pub fn steer(&mut self, requested: Direction) {
        if requested != self.direction.opposite() {
            self.direction = requested;
        }
    }

    fn free_cells(&self) -> Vec<Cell> {
        let mut free = Vec::with_capacity((GRID_SIZE * GRID_SIZE) as usize);
        for x in 0..GRID_SIZE {
            for y in 0..GRID_SIZE {
                let cell = Cell::new(x, y);
                if !self.body.contains(&cell) {
                    free.push(cell);
                }
            }
        }
        free
    }

    /// Pick uniformly among unoccupied cells; `false` when the board is full.
    fn place_food(&mut self) -> bool {
        let free = self.free_cells();
        if free.is_empty() {
            return false;
        }
        self.food = free[self.rng.gen_range(0..free.len())];
        true
    }

    fn finish(&mut self) {
        self.phase = Phase::GameOver;
        log::info!("snake over: score {} length {}", self.score, self.body.len());
        self.events.push(GameEvent::Finished { score: self.score });
    }

    fn step(&mut self) {
        let (dx, dy) = self.direction.delta();
        let head = Cell::new(self.body[0].x + dx, self.body[0].y + dy);
        if !head.in_bounds() {
            self.finish();
            return;
        }

        let eats = head == self.food;
        // The tail moves out of the way this tick unless the snake grows.
        let solid = if eats { self.body.len() } else { self.body.len() - 1 };
        if self.body[..solid].contains(&head) {
            self.finish();
            return;
        }

        self.body.insert(0, head);
        if eats {
            self.score += 1;
            self.events.push(GameEvent::ScoreChanged(self.score));
            if !self.place_food() {
                self.finish();
            }
        } else {
            self.body.pop();
        }
    }

    #[cfg(test)]
    fn set_state(&mut self, body: Vec<Cell>, direction: Direction, food: Cell) {
        self.body = body;
        self.direction = direction;
        self.food = food;
        self.phase = Phase::Playing;
    }
}

impl Game for Snake {
    fn tick(&mut self) {
        if self.phase != Phase::Playing {
            return;
        }
        self.step();
    }

    fn handle_input(&mut self, input: KeyInput) {
        if !input.pressed || self.phase.is_terminal() {
            return;
        }
        match input.key {
            Key::Up => self.steer(Direction::Up),
            Key::Down => self.steer(Direction::Down),
            Key::Left => self.steer(Direction::Left),
            Key::Right => self.steer(Direction::Right),
            _ => {}
        }
    }

    fn start(&mut self) {
        if self.phase == Phase::Countdown {
            self.phase = Phase::Playing;
        }
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn score(&self) -> u32 {
        self.score
    }

    fn tick_period(&self) -> Duration {
        let ms = BASE_PERIOD_MS
            .saturating_sub(self.score as u64 * SPEED_STEP_MS)
            .max(MIN_PERIOD_MS);
        Duration::from_millis(ms)
    }

    fn countdown(&self) -> Duration {
        Duration::from_secs(COUNTDOWN_SECS)
    }

    fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let inner = game_block(frame, area, GameId::Snake.title(), Color::Rgb(80, 220, 80));
        // Two columns per cell keeps the board roughly square in a terminal.
        let w = (GRID_SIZE * 2) as usize;
        let h = GRID_SIZE as usize;
        let mut canvas = Canvas::new(w.min(inner.width as usize), h.min(inner.height as usize), Color::Reset);
        for (i, seg) in self.body.iter().enumerate() {
            let color = if i == 0 { Color::Rgb(160, 255, 160) } else { Color::Rgb(60, 200, 60) };
            canvas.put(seg.x * 2, seg.y, '█', color);
            canvas.put(seg.x * 2 + 1, seg.y, '█', color);
        }
        canvas.put(self.food.x * 2, self.food.y, '●', Color::Rgb(255, 80, 80));
        frame.render_widget(Paragraph::new(canvas.into_lines()), inner);
    }
}
