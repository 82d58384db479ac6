use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::{Game, GameEvent, GameId, Key, KeyInput, Phase};
use crate::ui::canvas::{game_block, Canvas};

pub const GRID_WIDTH: usize = 10;
pub const GRID_HEIGHT: usize = 20;
const POINTS_PER_LINE: u32 = 100;
const BASE_PERIOD_MS: u64 = 800;
const MIN_PERIOD_MS: u64 = 100;
const SPEED_STEP_MS: u64 = 50;

/// Offsets tried in order when a rotation collides.
const WALL_KICKS: [(i32, i32); 6] = [(0, 0), (-1, 0), (1, 0), (0, -1), (-1, -1), (1, -1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    fn matrix(&self) -> Vec<Vec<bool>> {
        let rows: &[&[u8]] = match self {
            PieceKind::I => &[&[0, 0, 0, 0], &[1, 1, 1, 1], &[0, 0, 0, 0], &[0, 0, 0, 0]],
            PieceKind::O => &[&[1, 1], &[1, 1]],
            PieceKind::T => &[&[0, 1, 0], &[1, 1, 1], &[0, 0, 0]],
            PieceKind::S => &[&[0, 1, 1], &[1, 1, 0], &[0, 0, 0]],
            PieceKind::Z => &[&[1, 1, 0], &[0, 1, 1], &[0, 0, 0]],
            PieceKind::J => &[&[1, 0, 0], &[1, 1, 1], &[0, 0, 0]],
            PieceKind::L => &[&[0, 0, 1], &[1, 1, 1], &[0, 0, 0]],
        };
        rows.iter().map(|r| r.iter().map(|&c| c == 1).collect()).collect()
    }

    pub fn color(&self) -> Color {
        match self {
            PieceKind::I => Color::Cyan,
            PieceKind::O => Color::Yellow,
            PieceKind::T => Color::Magenta,
            PieceKind::S => Color::Green,
            PieceKind::Z => Color::Red,
            PieceKind::J => Color::Blue,
            PieceKind::L => Color::Rgb(255, 165, 0),
        }
    }
}

/// Quarter turn clockwise: `rotated[x][n-1-y] = m[y][x]`.
fn rotate_matrix(m: &[Vec<bool>]) -> Vec<Vec<bool>> {
    let n = m.len();
    let mut rotated = vec![vec![false; n]; n];
    for (y, row) in m.iter().enumerate() {
        for (x, &filled) in row.iter().enumerate() {
            rotated[x][n - 1 - y] = filled;
        }
    }
    rotated
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub kind: PieceKind,
    pub x: i32,
    pub y: i32,
    pub rotation: u8,
}

impl Piece {
    pub fn spawn(kind: PieceKind) -> Self {
        Self {
            kind,
            x: GRID_WIDTH as i32 / 2 - 1,
            y: 0,
            rotation: 0,
        }
    }

    /// Absolute grid cells covered by the piece.
    pub fn cells(&self) -> Vec<(i32, i32)> {
        let mut shape = self.kind.matrix();
        for _ in 0..self.rotation {
            shape = rotate_matrix(&shape);
        }
        let mut cells = Vec::with_capacity(4);
        for (dy, row) in shape.iter().enumerate() {
            for (dx, &filled) in row.iter().enumerate() {
                if filled {
                    cells.push((self.x + dx as i32, self.y + dy as i32));
                }
            }
        }
        cells
    }

    fn shifted(&self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..*self }
    }
}

pub type Grid = Vec<Vec<Option<PieceKind>>>;

pub fn empty_grid() -> Grid {
    vec![vec![None; GRID_WIDTH]; GRID_HEIGHT]
}

pub fn collides(piece: &Piece, grid: &Grid) -> bool {
    piece.cells().into_iter().any(|(x, y)| {
        x < 0
            || x >= GRID_WIDTH as i32
            || y >= GRID_HEIGHT as i32
            || (y >= 0 && grid[y as usize][x as usize].is_some())
    })
}

/// Drop complete rows and pad the top with empty ones; returns the count removed.
pub fn clear_lines(grid: &mut Grid) -> u32 {
    let before = grid.len();
    grid.retain(|row| row.iter().any(|c| c.is_none()));
    let cleared = before - grid.len();
    for _ in 0..cleared {
        grid.insert(0, vec![None; GRID_WIDTH]);
    }
    cleared as u32
}

pub struct Tetris {
    grid: Grid,
    current: Option<Piece>,
    next: PieceKind,
    score: u32,
    lines: u32,
    phase: Phase,
    events: Vec<GameEvent>,
    rng: StdRng,
}

impl Tetris {
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let first = PieceKind::ALL[rng.gen_range(0..PieceKind::ALL.len())];
        let next = PieceKind::ALL[rng.gen_range(0..PieceKind::ALL.len())];
        Self {
            grid: empty_grid(),
            current: Some(Piece::spawn(first)),
            next,
            score: 0,
            lines: 0,
            phase: Phase::Countdown,
            events: Vec::new(),
            rng,
        }
    }

    #[cfg(test)]
    fn grid(&self) -> &Grid {
        &self.grid
    }

    #[cfg(test)]
    fn current(&self) -> Option<Piece> {
        self.current
    }

    #[cfg(test)]
    fn lines(&self) -> u32 {
        self.lines
    }

    fn roll_kind(&mut self) -> PieceKind {
        PieceKind::ALL[self.rng.gen_range(0..PieceKind::ALL.len())]
    }

    pub fn shift(&mut self, dx: i32) {
        if let Some(piece) = self.current {
            let moved = piece.shifted(dx, 0);
            if !collides(&moved, &self.grid) {
                self.current = Some(moved);
            }
        }
    }

    pub fn rotate(&mut self) {
        let Some(piece) = self.current else { return };
        let rotated = Piece { rotation: (piece.rotation + 1) % 4, ..piece };
        for (kx, ky) in WALL_KICKS {
            let candidate = rotated.shifted(kx, ky);
            if !collides(&candidate, &self.grid) {
                self.current = Some(candidate);
                return;
            }
        }
    }

    /// Gravity step. A blocked piece locks immediately, no grace period.
    pub fn drop_one(&mut self) {
        let Some(piece) = self.current else { return };
        let lowered = piece.shifted(0, 1);
        if !collides(&lowered, &self.grid) {
            self.current = Some(lowered);
            return;
        }

        self.merge(&piece);
        let cleared = clear_lines(&mut self.grid);
        if cleared > 0 {
            self.lines += cleared;
            self.score += cleared * POINTS_PER_LINE;
            self.events.push(GameEvent::ScoreChanged(self.score));
        }
        self.spawn();
    }

    fn merge(&mut self, piece: &Piece) {
        for (x, y) in piece.cells() {
            if y >= 0 {
                self.grid[y as usize][x as usize] = Some(piece.kind);
            }
        }
    }

    fn spawn(&mut self) {
        let piece = Piece::spawn(self.next);
        self.next = self.roll_kind();
        if collides(&piece, &self.grid) {
            self.current = None;
            self.phase = Phase::GameOver;
            log::info!("tetris over: score {} lines {}", self.score, self.lines);
            self.events.push(GameEvent::Finished { score: self.score });
        } else {
            self.current = Some(piece);
        }
    }

    #[cfg(test)]
    fn with_board(grid: Grid, piece: Piece, next: PieceKind) -> Self {
        let mut t = Self::with_seed(0);
        t.grid = grid;
        t.current = Some(piece);
        t.next = next;
        t.phase = Phase::Playing;
        t
    }
}

impl Game for Tetris {
    fn tick(&mut self) {
        if self.phase != Phase::Playing {
            return;
        }
        self.drop_one();
    }

    fn handle_input(&mut self, input: KeyInput) {
        if !input.pressed || self.phase != Phase::Playing {
            return;
        }
        match input.key {
            Key::Left => self.shift(-1),
            Key::Right => self.shift(1),
            Key::Down => self.drop_one(),
            Key::Up | Key::Char('z') => self.rotate(),
            Key::Char('x') => {
                for _ in 0..3 {
                    self.rotate();
                }
            }
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
        let steps = (self.score / POINTS_PER_LINE) as u64;
        let ms = BASE_PERIOD_MS
            .saturating_sub(steps * SPEED_STEP_MS)
            .max(MIN_PERIOD_MS);
        Duration::from_millis(ms)
    }

    fn countdown(&self) -> Duration {
        Duration::ZERO
    }

    fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let inner = game_block(frame, area, GameId::Tetris.title(), Color::Rgb(80, 200, 255));
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(GRID_WIDTH as u16 * 2 + 2), Constraint::Min(10)])
            .split(inner);

        let mut canvas = Canvas::new(GRID_WIDTH * 2, GRID_HEIGHT, Color::Reset);
        for (y, row) in self.grid.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                match cell {
                    Some(kind) => {
                        canvas.put(x as i32 * 2, y as i32, '█', kind.color());
                        canvas.put(x as i32 * 2 + 1, y as i32, '█', kind.color());
                    }
                    None => canvas.put(x as i32 * 2, y as i32, '·', Color::DarkGray),
                }
            }
        }
        if let Some(piece) = self.current {
            for (x, y) in piece.cells() {
                canvas.put(x * 2, y, '█', piece.kind.color());
                canvas.put(x * 2 + 1, y, '█', piece.kind.color());
            }
        }
        let board = Paragraph::new(canvas.into_lines())
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Rgb(40, 100, 140))));
        frame.render_widget(board, chunks[0]);

        let mut preview = Canvas::new(8, 4, Color::Reset);
        let shown = Piece { kind: self.next, x: 0, y: 0, rotation: 0 };
        for (x, y) in shown.cells() {
            preview.put(x * 2, y, '█', self.next.color());
            preview.put(x * 2 + 1, y, '█', self.next.color());
        }
        let mut lines = vec![
            Line::from(Span::styled(" Next", Style::default().add_modifier(Modifier::BOLD))),
            Line::from(""),
        ];
        lines.extend(preview.into_lines());
        lines.push(Line::from(""));
        lines.push(Line::from(format!(" Lines: {}", self.lines)));
        frame.render_widget(Paragraph::new(lines), chunks[1]);
    }
}
