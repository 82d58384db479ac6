use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::{Game, GameEvent, GameId, Key, KeyInput, Phase};
use crate::ui::canvas::{game_block, Canvas};

pub const FIELD_WIDTH: f32 = 600.0;
pub const FIELD_HEIGHT: f32 = 500.0;
const PLAYER_WIDTH: f32 = 40.0;
const PLAYER_HEIGHT: f32 = 20.0;
const ALIEN_SIZE: f32 = 30.0;
const BULLET_SIZE: f32 = 5.0;
const PLAYER_SPEED: f32 = 5.0;
const BULLET_SPEED: f32 = 7.0;
const ALIEN_BULLET_SPEED: f32 = BULLET_SPEED * 0.5;
const ALIEN_STEP: f32 = 20.0;
const ALIEN_DROP: f32 = ALIEN_SIZE;
const ALIENS_PER_ROW: usize = 8;
const ALIEN_ROWS: usize = 4;
/// Ticks between formation steps.
const MOVE_INTERVAL: u32 = 30;
/// Ticks between alien shots (~500ms at 60Hz).
const FIRE_INTERVAL: u32 = 30;
/// Player rate limit (~250ms at 60Hz).
const SHOT_COOLDOWN: u32 = 15;
/// A held direction lapses after this many ticks without a repeat or release.
const HOLD_TICKS: u32 = 10;
const KILL_POINTS: u32 = 10;
const WIN_BONUS: u32 = 100;
const TICK_MS: u64 = 16;
const COUNTDOWN_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alien {
    pub x: f32,
    pub y: f32,
    pub alive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    pub active: bool,
}

impl Bullet {
    fn at(x: f32, y: f32) -> Self {
        Self { x, y, active: true }
    }

    fn inside(&self, x: f32, y: f32, w: f32, h: f32) -> bool {
        self.x >= x && self.x <= x + w && self.y >= y && self.y <= y + h
    }
}

/// Intents latched by key events and consumed by the next tick.
#[derive(Debug, Clone, Copy, Default)]
struct Intent {
    left: u32,
    right: u32,
    fire: bool,
}

pub struct Invaders {
    player_x: f32,
    aliens: Vec<Alien>,
    bullets: Vec<Bullet>,
    alien_bullets: Vec<Bullet>,
    direction: f32,
    move_frame: u32,
    fire_timer: u32,
    cooldown: u32,
    intent: Intent,
    score: u32,
    phase: Phase,
    events: Vec<GameEvent>,
    rng: StdRng,
}

impl Invaders {
    pub fn with_seed(seed: u64) -> Self {
        let mut aliens = Vec::with_capacity(ALIEN_ROWS * ALIENS_PER_ROW);
        for row in 0..ALIEN_ROWS {
            for col in 0..ALIENS_PER_ROW {
                aliens.push(Alien {
                    x: col as f32 * (ALIEN_SIZE + 20.0) + 50.0,
                    y: row as f32 * (ALIEN_SIZE + 20.0) + 50.0,
                    alive: true,
                });
            }
        }
        Self {
            player_x: FIELD_WIDTH / 2.0,
            aliens,
            bullets: Vec::new(),
            alien_bullets: Vec::new(),
            direction: 1.0,
            move_frame: 0,
            fire_timer: 0,
            cooldown: 0,
            intent: Intent::default(),
            score: 0,
            phase: Phase::Countdown,
            events: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[cfg(test)]
    fn aliens(&self) -> &[Alien] {
        &self.aliens
    }

    #[cfg(test)]
    fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    #[cfg(test)]
    fn alien_bullets(&self) -> &[Bullet] {
        &self.alien_bullets
    }

    #[cfg(test)]
    fn player_x(&self) -> f32 {
        self.player_x
    }

    fn player_y() -> f32 {
        FIELD_HEIGHT - 40.0
    }

    fn move_player(&mut self) {
        if self.intent.left > 0 {
            self.player_x = (self.player_x - PLAYER_SPEED).max(0.0);
            self.intent.left -= 1;
        }
        if self.intent.right > 0 {
            self.player_x = (self.player_x + PLAYER_SPEED).min(FIELD_WIDTH - PLAYER_WIDTH);
            self.intent.right -= 1;
        }
    }

    fn fire(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
        if !std::mem::take(&mut self.intent.fire) || self.cooldown > 0 {
            return;
        }
        self.bullets.push(Bullet::at(self.player_x + PLAYER_WIDTH / 2.0, Self::player_y()));
        self.cooldown = SHOT_COOLDOWN;
    }

    /// March the formation one step, or drop and turn around at a wall.
    fn march(&mut self) {
        let at_frame = self.move_frame == 0;
        self.move_frame = (self.move_frame + 1) % MOVE_INTERVAL;
        if !at_frame {
            return;
        }
        let step = ALIEN_STEP * self.direction;
        let hits_wall = self.aliens.iter().filter(|a| a.alive).any(|a| {
            let next_x = a.x + step;
            next_x <= 0.0 || next_x >= FIELD_WIDTH - ALIEN_SIZE
        });
        if hits_wall {
            self.direction = -self.direction;
            for alien in self.aliens.iter_mut().filter(|a| a.alive) {
                alien.y += ALIEN_DROP;
            }
        } else {
            for alien in self.aliens.iter_mut().filter(|a| a.alive) {
                alien.x += step;
            }
        }
    }

    fn update_bullets(&mut self) {
        for bullet in &mut self.bullets {
            bullet.y -= BULLET_SPEED;
            bullet.active = bullet.y >= 0.0;
        }

        for bullet in self.bullets.iter_mut().filter(|b| b.active) {
            // Scan order decides; one bullet never takes out two aliens.
            let hit = self
                .aliens
                .iter_mut()
                .find(|a| a.alive && bullet.inside(a.x, a.y, ALIEN_SIZE, ALIEN_SIZE));
            if let Some(alien) = hit {
                alien.alive = false;
                bullet.active = false;
                self.score += KILL_POINTS;
                self.events.push(GameEvent::ScoreChanged(self.score));
            }
        }
        self.bullets.retain(|b| b.active);

        for bullet in &mut self.alien_bullets {
            bullet.y += ALIEN_BULLET_SPEED;
            bullet.active = bullet.y <= FIELD_HEIGHT;
        }
        self.alien_bullets.retain(|b| b.active);
    }

    fn alien_fire(&mut self) {
        self.fire_timer += 1;
        if self.fire_timer < FIRE_INTERVAL {
            return;
        }
        self.fire_timer = 0;
        let living: Vec<Alien> = self.aliens.iter().filter(|a| a.alive).copied().collect();
        if living.is_empty() {
            return;
        }
        let shooter = living[self.rng.gen_range(0..living.len())];
        self.alien_bullets
            .push(Bullet::at(shooter.x + ALIEN_SIZE / 2.0, shooter.y + ALIEN_SIZE));
    }

    fn finish(&mut self, phase: Phase) {
        self.phase = phase;
        log::info!("invaders {:?}: score {}", phase, self.score);
        self.events.push(GameEvent::Finished { score: self.score });
    }

    fn check_outcome(&mut self) {
        let py = Self::player_y();
        let shot = self
            .alien_bullets
            .iter()
            .any(|b| b.inside(self.player_x, py, PLAYER_WIDTH, PLAYER_HEIGHT));
        let landed = self.aliens.iter().any(|a| a.alive && a.y + ALIEN_SIZE >= py);
        if shot || landed {
            self.finish(Phase::Lost);
        } else if self.aliens.iter().all(|a| !a.alive) {
            self.score += WIN_BONUS;
            self.events.push(GameEvent::ScoreChanged(self.score));
            self.finish(Phase::Won);
        }
    }

    #[cfg(test)]
    fn arena(aliens: Vec<Alien>) -> Self {
        let mut s = Self::with_seed(9);
        s.aliens = aliens;
        s.phase = Phase::Playing;
        // Skip the formation step due on the first tick.
        s.move_frame = 1;
        s
    }
}

impl Game for Invaders {
    fn tick(&mut self) {
        if self.phase != Phase::Playing {
            return;
        }
        self.move_player();
        self.fire();
        self.march();
        self.update_bullets();
        self.alien_fire();
        self.check_outcome();
    }

    fn handle_input(&mut self, input: KeyInput) {
        if self.phase.is_terminal() {
            return;
        }
        let hold = if input.pressed { HOLD_TICKS } else { 0 };
        match input.key {
            Key::Left => {
                self.intent.left = hold;
                if input.pressed {
                    self.intent.right = 0;
                }
            }
            Key::Right => {
                self.intent.right = hold;
                if input.pressed {
                    self.intent.left = 0;
                }
            }
            Key::Space | Key::Up if input.pressed && self.phase == Phase::Playing => {
                self.intent.fire = true;
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
        Duration::from_millis(TICK_MS)
    }

    fn countdown(&self) -> Duration {
        Duration::from_secs(COUNTDOWN_SECS)
    }

    fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let inner = game_block(frame, area, GameId::Invaders.title(), Color::Rgb(80, 255, 80));
        let field = (FIELD_WIDTH, FIELD_HEIGHT);
        let mut canvas = Canvas::new(inner.width as usize, inner.height as usize, Color::Rgb(0, 0, 5));
        for alien in self.aliens.iter().filter(|a| a.alive) {
            canvas.fill_scaled(field, alien.x, alien.y, ALIEN_SIZE, ALIEN_SIZE, '▓', Color::Rgb(200, 180, 255));
        }
        for bullet in &self.bullets {
            canvas.fill_scaled(field, bullet.x, bullet.y, BULLET_SIZE, BULLET_SIZE, '│', Color::Rgb(255, 255, 200));
        }
        for bullet in &self.alien_bullets {
            canvas.fill_scaled(field, bullet.x, bullet.y, BULLET_SIZE, BULLET_SIZE, '↓', Color::Rgb(255, 100, 100));
        }
        if self.phase != Phase::Lost {
            canvas.fill_scaled(
                field,
                self.player_x,
                Self::player_y(),
                PLAYER_WIDTH,
                PLAYER_HEIGHT,
                '▲',
                Color::Rgb(80, 255, 80),
            );
        }
        frame.render_widget(Paragraph::new(canvas.into_lines()), inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alien(x: f32, y: f32) -> Alien {
        Alien { x, y, alive: true }
    }

    /// A bullet that lands in the middle of an alien at (x, y) after one tick.
    fn bullet_under(x: f32, y: f32) -> Bullet {
        Bullet::at(x + ALIEN_SIZE / 2.0, y + ALIEN_SIZE / 2.0 + BULLET_SPEED)
    }

    #[test]
    fn test_one_bullet_kills_one_alien() {
        let mut game = Invaders::arena(vec![alien(100.0, 100.0), alien(100.0, 100.0), alien(300.0, 100.0)]);
        game.bullets.push(bullet_under(100.0, 100.0));

        game.tick();

        let dead = game.aliens().iter().filter(|a| !a.alive).count();
        assert_eq!(dead, 1);
        assert!(!game.aliens()[0].alive);
        assert!(game.aliens()[1].alive);
        assert!(game.bullets().is_empty());
        assert_eq!(game.score(), KILL_POINTS);
        assert_eq!(game.phase(), Phase::Playing);
    }

    #[test]
    fn test_clearing_wave_wins_with_bonus() {
        let positions = [(100.0, 100.0), (200.0, 100.0), (300.0, 150.0)];
        let mut game = Invaders::arena(positions.iter().map(|&(x, y)| alien(x, y)).collect());
        game.score = 50;
        for &(x, y) in &positions {
            game.bullets.push(bullet_under(x, y));
        }

        game.tick();

        assert_eq!(game.phase(), Phase::Won);
        assert_eq!(game.score(), 50 + KILL_POINTS * 3 + WIN_BONUS);
        let events = game.drain_events();
        assert_eq!(events.last(), Some(&GameEvent::Finished { score: 180 }));
    }

    #[test]
    fn test_fire_cooldown_drops_requests() {
        let mut game = Invaders::arena(vec![alien(100.0, 50.0)]);
        game.handle_input(KeyInput::press(Key::Space));
        game.tick();
        assert_eq!(game.bullets().len(), 1);

        for _ in 0..5 {
            game.handle_input(KeyInput::press(Key::Space));
            game.tick();
        }
        assert_eq!(game.bullets().len(), 1);

        for _ in 0..SHOT_COOLDOWN {
            game.tick();
        }
        game.handle_input(KeyInput::press(Key::Space));
        game.tick();
        assert_eq!(game.bullets().len(), 2);
    }

    #[test]
    fn test_formation_turns_at_wall() {
        let mut game = Invaders::arena(vec![alien(550.0, 60.0), alien(100.0, 60.0)]);
        game.move_frame = 0;

        game.tick();

        assert_eq!(game.aliens()[0].x, 550.0);
        assert_eq!(game.aliens()[0].y, 60.0 + ALIEN_DROP);
        assert_eq!(game.aliens()[1].y, 60.0 + ALIEN_DROP);
        assert_eq!(game.direction, -1.0);

        for _ in 0..MOVE_INTERVAL {
            game.tick();
        }
        assert_eq!(game.aliens()[0].x, 550.0 - ALIEN_STEP);
    }

    #[test]
    fn test_dead_aliens_do_not_block_march() {
        let mut game = Invaders::arena(vec![Alien { x: 560.0, y: 60.0, alive: false }, alien(100.0, 60.0)]);
        game.move_frame = 0;
        game.tick();
        assert_eq!(game.aliens()[1].x, 100.0 + ALIEN_STEP);
    }

    #[test]
    fn test_alien_shot_loses() {
        let mut game = Invaders::arena(vec![alien(100.0, 50.0)]);
        let py = Invaders::player_y();
        game.alien_bullets.push(Bullet::at(game.player_x() + 5.0, py - 2.0));

        game.tick();

        assert_eq!(game.phase(), Phase::Lost);
        assert_eq!(game.drain_events(), vec![GameEvent::Finished { score: 0 }]);
        game.tick();
        assert!(game.drain_events().is_empty());
    }

    #[test]
    fn test_loss_outranks_win_on_same_tick() {
        let mut game = Invaders::arena(vec![alien(100.0, 100.0)]);
        game.bullets.push(bullet_under(100.0, 100.0));
        let py = Invaders::player_y();
        game.alien_bullets.push(Bullet::at(game.player_x() + 5.0, py - 2.0));

        game.tick();

        assert!(game.aliens().iter().all(|a| !a.alive));
        assert_eq!(game.phase(), Phase::Lost);
        assert_eq!(game.score(), KILL_POINTS);
        assert_eq!(
            game.drain_events(),
            vec![GameEvent::ScoreChanged(KILL_POINTS), GameEvent::Finished { score: KILL_POINTS }]
        );
    }

    #[test]
    fn test_formation_reaching_player_loses() {
        let py = Invaders::player_y();
        let mut game = Invaders::arena(vec![alien(100.0, py - ALIEN_SIZE)]);
        game.tick();
        assert_eq!(game.phase(), Phase::Lost);
    }

    #[test]
    fn test_offscreen_bullets_pruned() {
        let mut game = Invaders::arena(vec![alien(100.0, 50.0)]);
        game.bullets.push(Bullet::at(500.0, 3.0));
        game.alien_bullets.push(Bullet::at(10.0, FIELD_HEIGHT - 1.0));
        game.tick();
        assert!(game.bullets().is_empty());
        assert!(game.alien_bullets().is_empty());
    }

    #[test]
    fn test_aliens_fire_on_interval() {
        let mut game = Invaders::arena(vec![alien(100.0, 50.0)]);
        for _ in 0..FIRE_INTERVAL - 1 {
            game.tick();
        }
        assert!(game.alien_bullets().is_empty());
        game.tick();
        assert_eq!(game.alien_bullets().len(), 1);
    }

    #[test]
    fn test_held_direction_lapses_or_releases() {
        let mut game = Invaders::arena(vec![alien(100.0, 50.0)]);
        let start = game.player_x();
        game.handle_input(KeyInput::press(Key::Left));
        for _ in 0..HOLD_TICKS + 5 {
            game.tick();
        }
        assert_eq!(game.player_x(), start - PLAYER_SPEED * HOLD_TICKS as f32);

        let start = game.player_x();
        game.handle_input(KeyInput::press(Key::Right));
        game.tick();
        game.handle_input(KeyInput::release(Key::Right));
        game.tick();
        assert_eq!(game.player_x(), start + PLAYER_SPEED);
    }
}
