use std::f32::consts::FRAC_PI_4;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::{Game, GameEvent, GameId, Key, KeyInput, Phase};
use crate::ui::canvas::{game_block, Canvas};

pub const FIELD_WIDTH: f32 = 600.0;
pub const FIELD_HEIGHT: f32 = 400.0;
pub const PADDLE_HEIGHT: f32 = 60.0;
pub const PADDLE_WIDTH: f32 = 10.0;
pub const BALL_SIZE: f32 = 8.0;
const PADDLE_SPEED: f32 = 8.0;
const INITIAL_BALL_SPEED: f32 = 5.0;
/// Multiplicative speed-up applied on every paddle hit.
const SPEED_INCREASE: f32 = 0.2;
/// Fraction of the gap the CPU paddle closes each tick.
const CPU_FOLLOW: f32 = 0.1;
const TICK_MS: u64 = 16;
const COUNTDOWN_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paddle {
    /// Top edge.
    pub y: f32,
    pub score: u32,
}

impl Paddle {
    fn centered() -> Self {
        Self {
            y: FIELD_HEIGHT / 2.0 - PADDLE_HEIGHT / 2.0,
            score: 0,
        }
    }

    fn covers(&self, y: f32) -> bool {
        y >= self.y && y <= self.y + PADDLE_HEIGHT
    }

    fn clamp(&mut self) {
        self.y = self.y.clamp(0.0, FIELD_HEIGHT - PADDLE_HEIGHT);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

impl Ball {
    pub fn speed(&self) -> f32 {
        self.dx.hypot(self.dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

pub struct Pong {
    ball: Ball,
    player: Paddle,
    cpu: Paddle,
    /// Paddle steps requested since the last tick (negative is up).
    pending_steps: i32,
    phase: Phase,
    events: Vec<GameEvent>,
    rng: StdRng,
}

impl Pong {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            ball: Ball {
                x: FIELD_WIDTH / 2.0,
                y: FIELD_HEIGHT / 2.0,
                dx: INITIAL_BALL_SPEED,
                dy: INITIAL_BALL_SPEED,
            },
            player: Paddle::centered(),
            cpu: Paddle::centered(),
            pending_steps: 0,
            phase: Phase::Countdown,
            events: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[cfg(test)]
    fn ball(&self) -> Ball {
        self.ball
    }

    #[cfg(test)]
    fn player(&self) -> Paddle {
        self.player
    }

    #[cfg(test)]
    fn cpu(&self) -> Paddle {
        self.cpu
    }

    /// Serve from the center toward `toward`, with a bounded random slope.
    fn reset_ball(&mut self, toward: Side) {
        let dir = match toward {
            Side::Left => -1.0,
            Side::Right => 1.0,
        };
        self.ball = Ball {
            x: FIELD_WIDTH / 2.0,
            y: FIELD_HEIGHT / 2.0,
            dx: INITIAL_BALL_SPEED * dir,
            dy: INITIAL_BALL_SPEED * (self.rng.gen::<f32>() * 1.5 - 0.75),
        };
    }

    /// New velocity after striking `paddle`, angled by where the ball met it.
    fn deflect(ball: &Ball, paddle: &Paddle, side: Side) -> (f32, f32) {
        let half = PADDLE_HEIGHT / 2.0;
        let relative = ((paddle.y + half - ball.y) / half).clamp(-1.0, 1.0);
        let angle = relative * FRAC_PI_4;
        // Saturate rather than overflow to infinity after a very long rally.
        let speed = (ball.speed() * (1.0 + SPEED_INCREASE)).min(f32::MAX);
        let dx = (speed * angle.cos()).abs();
        let dx = match side {
            Side::Left => dx,
            Side::Right => -dx,
        };
        (dx, -speed * angle.sin())
    }

    fn move_ball(&mut self) {
        let ball = &mut self.ball;
        ball.x += ball.dx;
        ball.y += ball.dy;

        if ball.y <= BALL_SIZE / 2.0 {
            ball.y = BALL_SIZE / 2.0;
            ball.dy = ball.dy.abs();
        } else if ball.y >= FIELD_HEIGHT - BALL_SIZE / 2.0 {
            ball.y = FIELD_HEIGHT - BALL_SIZE / 2.0;
            ball.dy = -ball.dy.abs();
        }

        if ball.dx < 0.0 && ball.x <= PADDLE_WIDTH + BALL_SIZE && self.player.covers(ball.y) {
            (ball.dx, ball.dy) = Self::deflect(ball, &self.player, Side::Left);
            ball.x = PADDLE_WIDTH + BALL_SIZE;
        } else if ball.dx > 0.0
            && ball.x >= FIELD_WIDTH - PADDLE_WIDTH - BALL_SIZE
            && self.cpu.covers(ball.y)
        {
            (ball.dx, ball.dy) = Self::deflect(ball, &self.cpu, Side::Right);
            ball.x = FIELD_WIDTH - PADDLE_WIDTH - BALL_SIZE;
        }

        if self.ball.x <= 0.0 {
            self.cpu.score += 1;
            self.reset_ball(Side::Left);
        } else if self.ball.x >= FIELD_WIDTH {
            self.player.score += 1;
            self.events.push(GameEvent::ScoreChanged(self.player.score));
            self.reset_ball(Side::Right);
        }
    }

    fn move_cpu(&mut self) {
        let target = self.ball.y - PADDLE_HEIGHT / 2.0;
        self.cpu.y += (target - self.cpu.y) * CPU_FOLLOW;
        self.cpu.clamp();
    }

    #[cfg(test)]
    fn playing_with(ball: Ball) -> Self {
        let mut p = Self::with_seed(42);
        p.ball = ball;
        p.phase = Phase::Playing;
        p
    }
}

impl Game for Pong {
    fn tick(&mut self) {
        if self.phase != Phase::Playing {
            return;
        }
        if self.pending_steps != 0 {
            self.player.y += self.pending_steps as f32 * PADDLE_SPEED;
            self.player.clamp();
            self.pending_steps = 0;
        }
        self.move_ball();
        self.move_cpu();
    }

    fn handle_input(&mut self, input: KeyInput) {
        if !input.pressed || self.phase != Phase::Playing {
            return;
        }
        match input.key {
            Key::Up => self.pending_steps -= 1,
            Key::Down => self.pending_steps += 1,
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
        self.player.score
    }

    fn tick_period(&self) -> Duration {
        Duration::from_millis(TICK_MS)
    }

    fn countdown(&self) -> Duration {
        Duration::from_secs(COUNTDOWN_SECS)
    }

    fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let inner = game_block(frame, area, GameId::Pong.title(), Color::Rgb(255, 255, 255));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(4)])
            .split(inner);

        let tally = Line::from(vec![
            Span::styled(format!(" Player: {}", self.player.score), Style::default().fg(Color::Green)),
            Span::styled("  |  ", Style::default().fg(Color::DarkGray)),
            Span::styled(format!("CPU: {}", self.cpu.score), Style::default().fg(Color::Red)),
        ]);
        frame.render_widget(Paragraph::new(tally), chunks[0]);

        let field = (FIELD_WIDTH, FIELD_HEIGHT);
        let mut canvas = Canvas::new(chunks[1].width as usize, chunks[1].height as usize, Color::Reset);
        let mid = chunks[1].width as i32 / 2;
        for y in (0..chunks[1].height as i32).step_by(2) {
            canvas.put(mid, y, '┊', Color::DarkGray);
        }
        canvas.fill_scaled(field, 0.0, self.player.y, PADDLE_WIDTH, PADDLE_HEIGHT, '█', Color::Green);
        canvas.fill_scaled(
            field,
            FIELD_WIDTH - PADDLE_WIDTH,
            self.cpu.y,
            PADDLE_WIDTH,
            PADDLE_HEIGHT,
            '█',
            Color::Red,
        );
        let half = BALL_SIZE / 2.0;
        canvas.fill_scaled(field, self.ball.x - half, self.ball.y - half, BALL_SIZE, BALL_SIZE, '●', Color::White);
        frame.render_widget(Paragraph::new(canvas.into_lines()), chunks[1]);
    }
}
