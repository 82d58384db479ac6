use std::time::Duration;

use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::scheduler::{Countdown, TickScheduler};
use crate::games::{Game, GameEvent, GameId, KeyInput};
use crate::scores::HighScoreStore;

/// Receives score traffic from a running session.
pub trait ScoreReporter {
    fn on_score_update(&mut self, score: u32);
    /// Called exactly once per session.
    fn on_game_over(&mut self, final_score: u32, high_score: u32);
}

/// One play-through of one game. Dropping the session stops its clock and
/// discards any queued input.
pub struct Session {
    id: GameId,
    engine: Box<dyn Game>,
    scheduler: TickScheduler,
    countdown: Countdown,
    pending: Vec<KeyInput>,
    best: u32,
    reported: bool,
}

impl Session {
    pub fn start(id: GameId, seed: u64, store: &dyn HighScoreStore) -> Self {
        let mut engine = id.launch(seed);
        let countdown = Countdown::new(engine.countdown());
        if countdown.is_done() {
            engine.start();
        }
        log::info!("session start: {} (seed {})", id, seed);
        Self {
            id,
            engine,
            scheduler: TickScheduler::new(),
            countdown,
            pending: Vec::new(),
            best: store.high_score(id),
            reported: false,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    #[cfg(test)]
    fn score(&self) -> u32 {
        self.engine.score()
    }

    #[cfg(test)]
    fn is_finished(&self) -> bool {
        self.reported
    }

    /// Queue a key for the next frame. The engine never sees input mid-tick.
    pub fn handle_key(&mut self, input: KeyInput) {
        if !self.reported {
            self.pending.push(input);
        }
    }

    pub fn update(
        &mut self,
        elapsed: Duration,
        store: &mut dyn HighScoreStore,
        reporter: &mut dyn ScoreReporter,
    ) {
        if self.reported {
            return;
        }
        for input in self.pending.drain(..) {
            self.engine.handle_input(input);
        }

        if !self.countdown.is_done() {
            if self.countdown.advance(elapsed) {
                self.engine.start();
            }
        } else {
            let due = self.scheduler.advance(elapsed, self.engine.tick_period());
            for _ in 0..due {
                self.engine.tick();
                if self.engine.is_terminal() {
                    break;
                }
            }
        }
        self.dispatch(store, reporter);
    }

    /// Leave the game. Endless games have no game-over of their own, so
    /// leaving is what records their score.
    pub fn close(mut self, store: &mut dyn HighScoreStore, reporter: &mut dyn ScoreReporter) {
        self.dispatch(store, reporter);
        if self.id.is_endless() && !self.reported {
            let score = self.engine.score();
            self.finalize(score, store, reporter);
        }
        log::info!("session end: {} score {}", self.id, self.engine.score());
    }

    fn dispatch(&mut self, store: &mut dyn HighScoreStore, reporter: &mut dyn ScoreReporter) {
        for event in self.engine.drain_events() {
            match event {
                GameEvent::ScoreChanged(score) => reporter.on_score_update(score),
                GameEvent::Finished { score } => self.finalize(score, store, reporter),
            }
        }
    }

    fn finalize(&mut self, score: u32, store: &mut dyn HighScoreStore, reporter: &mut dyn ScoreReporter) {
        if self.reported {
            return;
        }
        let high = store.high_score(self.id).max(score);
        store.set_high_score(self.id, high);
        self.best = high;
        self.reported = true;
        log::info!("{} over: score {} high {}", self.id, score, high);
        reporter.on_game_over(score, high);
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(6), Constraint::Length(1)])
            .split(area);

        let score = self.engine.score();
        let status = Line::from(vec![
            Span::styled(
                format!(" Score: {} ", score),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" | ", Style::default().fg(Color::DarkGray)),
            Span::styled(format!("High Score: {}", self.best.max(score)), Style::default().fg(Color::Cyan)),
        ]);
        frame.render_widget(Paragraph::new(status), chunks[0]);

        self.engine.render(frame, chunks[1]);

        if !self.countdown.is_done() {
            let w = 9u16.min(chunks[1].width);
            let overlay = Rect::new(
                chunks[1].x + chunks[1].width.saturating_sub(w) / 2,
                chunks[1].y + chunks[1].height / 2,
                w,
                1,
            );
            frame.render_widget(Clear, overlay);
            let text = Paragraph::new(format!("{}", self.countdown.seconds_left()))
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD));
            frame.render_widget(text, overlay);
        }

        let help = Line::from(vec![
            Span::styled(" Arrows", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::styled(" move  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Space", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::styled(" fire  ", Style::default().fg(Color::DarkGray)),
            Span::styled("z/x", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::styled(" rotate  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Esc", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::styled(" exit", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(help), chunks[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::Key;
    use crate::scores::HighScores;

    #[derive(Default)]
    struct Recorder {
        updates: Vec<u32>,
        game_overs: Vec<(u32, u32)>,
    }

    impl ScoreReporter for Recorder {
        fn on_score_update(&mut self, score: u32) {
            self.updates.push(score);
        }

        fn on_game_over(&mut self, final_score: u32, high_score: u32) {
            self.game_overs.push((final_score, high_score));
        }
    }

    fn run(session: &mut Session, store: &mut HighScores, rec: &mut Recorder, frames: usize) {
        for _ in 0..frames {
            session.update(Duration::from_millis(500), store, rec);
        }
    }

    #[test]
    fn test_snake_runs_into_wall_and_reports_once() {
        let mut store = HighScores::in_memory();
        store.set_high_score(GameId::Snake, 7);
        let mut rec = Recorder::default();
        let mut session = Session::start(GameId::Snake, 1, &store);

        run(&mut session, &mut store, &mut rec, 20);

        assert!(session.is_finished());
        assert_eq!(rec.game_overs.len(), 1);
        let (score, high) = rec.game_overs[0];
        assert_eq!(high, score.max(7));
        assert_eq!(store.high_score(GameId::Snake), high);
    }

    #[test]
    fn test_high_score_rises_with_better_run() {
        let mut store = HighScores::in_memory();
        let mut rec = Recorder::default();
        let mut session = Session::start(GameId::Pong, 3, &store);
        session.finalize(12, &mut store, &mut rec);
        assert_eq!(store.high_score(GameId::Pong), 12);

        let mut session = Session::start(GameId::Pong, 3, &store);
        session.finalize(4, &mut store, &mut rec);
        assert_eq!(store.high_score(GameId::Pong), 12);
        assert_eq!(rec.game_overs, vec![(12, 12), (4, 12)]);
    }

    #[test]
    fn test_countdown_holds_engine() {
        let mut store = HighScores::in_memory();
        let mut rec = Recorder::default();
        let mut session = Session::start(GameId::Invaders, 5, &store);
        session.update(Duration::from_secs(1), &mut store, &mut rec);
        assert_eq!(session.engine.phase(), crate::games::Phase::Countdown);
        session.update(Duration::from_secs(2), &mut store, &mut rec);
        assert_eq!(session.engine.phase(), crate::games::Phase::Playing);
    }

    #[test]
    fn test_tetris_starts_without_countdown() {
        let store = HighScores::in_memory();
        let session = Session::start(GameId::Tetris, 5, &store);
        assert_eq!(session.engine.phase(), crate::games::Phase::Playing);
    }

    #[test]
    fn test_closing_endless_game_reports_score() {
        let mut store = HighScores::in_memory();
        let mut rec = Recorder::default();
        let session = Session::start(GameId::Pong, 2, &store);
        session.close(&mut store, &mut rec);
        assert_eq!(rec.game_overs, vec![(0, 0)]);
    }

    #[test]
    fn test_closing_unfinished_game_reports_nothing() {
        let mut store = HighScores::in_memory();
        store.set_high_score(GameId::Snake, 3);
        let mut rec = Recorder::default();
        let session = Session::start(GameId::Snake, 2, &store);
        session.close(&mut store, &mut rec);
        assert!(rec.game_overs.is_empty());
        assert_eq!(store.high_score(GameId::Snake), 3);
    }

    #[test]
    fn test_queued_keys_reach_engine_on_update() {
        let mut store = HighScores::in_memory();
        let mut rec = Recorder::default();
        let mut session = Session::start(GameId::Snake, 4, &store);
        // Down from (10,10) for five cells, then right for five lands on the food at (15,15).
        session.handle_key(KeyInput::press(Key::Down));
        session.update(Duration::from_secs(2), &mut store, &mut rec);
        session.update(Duration::from_millis(500), &mut store, &mut rec);
        assert!(rec.updates.is_empty());

        session.handle_key(KeyInput::press(Key::Right));
        session.update(Duration::from_millis(500), &mut store, &mut rec);
        assert_eq!(rec.updates, vec![1]);
        assert_eq!(session.score(), 1);
        assert!(!session.is_finished());
    }
}
