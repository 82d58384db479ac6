use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rand::Rng;

use crate::event::key_input;
use crate::games::session::{ScoreReporter, Session};
use crate::games::GameId;
use crate::leaderboard::Leaderboard;
use crate::scores::HighScores;
use crate::settings::Settings;

const MAX_NAME_LEN: usize = 16;

const HELP: &str = "Available commands:
list - Show available games
play [game] - Start a game
exit - Exit current game
scores - Show your high scores
leaderboard [game] - Show the top 10 for a game
name [player] - Show or set your player name
cube - Draw a cube
clear - Clear terminal
help - Show this help message
quit - Leave the hub";

const CUBE: &str = "    +------------+
   /            /|
  /            / |
 /            /  |
+------------+   |
|            |   |
|            |   +
|            |  /
|            | /
|            |/
+------------+";

/// One entry of the shell transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub command: String,
    pub output: String,
}

/// Collects what a session reports during one frame.
#[derive(Debug, Default)]
struct FrameReport {
    score: Option<u32>,
    game_over: Option<(u32, u32)>,
}

impl ScoreReporter for FrameReport {
    fn on_score_update(&mut self, score: u32) {
        self.score = Some(score);
    }

    fn on_game_over(&mut self, final_score: u32, high_score: u32) {
        self.game_over = Some((final_score, high_score));
    }
}

pub struct App {
    pub should_quit: bool,
    pub history: Vec<Record>,
    pub input: String,
    pub session: Option<Session>,
    pub high_scores: HighScores,
    pub settings: Settings,
    settings_path: Option<PathBuf>,
    leaderboard: Box<dyn Leaderboard>,
    last_frame: Instant,
}

impl App {
    pub fn new(
        settings: Settings,
        settings_path: Option<PathBuf>,
        high_scores: HighScores,
        leaderboard: Box<dyn Leaderboard>,
    ) -> Self {
        Self {
            should_quit: false,
            history: Vec::new(),
            input: String::new(),
            session: None,
            high_scores,
            settings,
            settings_path,
            leaderboard,
            last_frame: Instant::now(),
        }
    }

    pub fn on_tick(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.advance(elapsed);
    }

    /// Run the active game for `elapsed` of wall time.
    pub fn advance(&mut self, elapsed: Duration) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let mut report = FrameReport::default();
        session.update(elapsed, &mut self.high_scores, &mut report);
        if let Some(score) = report.score {
            log::debug!("{} score {}", session.id(), score);
        }
        if let Some((score, high)) = report.game_over {
            let game = session.id();
            self.session = None;
            self.record_game_over(game, score, high);
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        // Ctrl+C always quits
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if let Some(session) = self.session.as_mut() {
            if key.code == KeyCode::Esc {
                if key.kind == KeyEventKind::Press {
                    self.exit_game("exit");
                }
            } else if let Some(input) = key_input(&key) {
                session.handle_key(input);
            }
            return;
        }

        if key.kind == KeyEventKind::Release {
            return;
        }
        match key.code {
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.input);
                self.run_command(&line);
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Esc => self.input.clear(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => self.input.push(c),
            _ => {}
        }
    }

    pub fn run_command(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        let cmd = trimmed.to_lowercase();
        let mut words = cmd.split_whitespace();
        let verb = words.next().unwrap_or_default();
        let arg = words.next();

        let output = match (verb, arg) {
            ("help", None) => HELP.to_string(),
            ("list", None) => {
                let mut out = String::from("Available games:");
                for game in GameId::all() {
                    out.push_str(&format!("\n{} - {}", game.name(), game.description()));
                }
                out
            }
            ("clear", None) => {
                self.history.clear();
                return;
            }
            ("play", Some(name)) => match GameId::parse(name) {
                Some(game) => {
                    self.start_game(game);
                    format!("Loading {}...", game)
                }
                None => format!("Game \"{}\" not found. Type \"list\" to see available games.", name),
            },
            ("exit", None) => {
                // Only reachable with no game running; a running game owns the keyboard.
                "No game is currently running.".to_string()
            }
            ("scores", None) => {
                let mut out = String::from("High scores:");
                for (game, score) in self.high_scores.iter() {
                    out.push_str(&format!("\n{} - {}", game.name(), score));
                }
                out
            }
            ("leaderboard", Some(name)) => match GameId::parse(name) {
                Some(game) => self.leaderboard_text(game),
                None => format!("Game \"{}\" not found. Type \"list\" to see available games.", name),
            },
            ("name", _) => {
                // Keep the player's own capitalisation.
                let rest = trimmed.split_once(char::is_whitespace).map(|(_, rest)| rest.trim());
                self.name_command(rest.unwrap_or_default())
            }
            ("cube", None) => CUBE.to_string(),
            ("quit", None) => {
                self.should_quit = true;
                return;
            }
            _ => format!("Command not found: {}. Type \"help\" for available commands.", cmd),
        };

        self.history.push(Record {
            command: trimmed.to_string(),
            output,
        });
    }

    fn start_game(&mut self, game: GameId) {
        let seed = self
            .settings
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen());
        self.session = Some(Session::start(game, seed, &self.high_scores));
        self.last_frame = Instant::now();
    }

    /// Leave the running game. Ending an endless game this way still
    /// produces its game-over record.
    pub fn exit_game(&mut self, command: &str) {
        let Some(session) = self.session.take() else {
            return;
        };
        let game = session.id();
        let mut report = FrameReport::default();
        session.close(&mut self.high_scores, &mut report);
        self.history.push(Record {
            command: command.to_string(),
            output: format!("Exiting {}...", game),
        });
        if let Some((score, high)) = report.game_over {
            self.record_game_over(game, score, high);
        }
    }

    fn record_game_over(&mut self, game: GameId, score: u32, high: u32) {
        let mut output = format!("Final Score: {}\nHigh Score: {}", score, high);
        if let Some(player) = self.settings.player_name.as_deref() {
            if score > 0 {
                if let Err(err) = self.leaderboard.submit_score(game, score, player) {
                    log::warn!("Leaderboard submit failed: {:#}", err);
                    output.push_str("\nFailed to submit score");
                }
            }
        }
        self.history.push(Record {
            command: "Game Over".to_string(),
            output,
        });
    }

    fn leaderboard_text(&self, game: GameId) -> String {
        match self.leaderboard.top_scores(game) {
            Ok(entries) if entries.is_empty() => "No scores yet!".to_string(),
            Ok(entries) => {
                let mut out = format!("Leaderboard - {}:", game);
                for (rank, entry) in entries.iter().enumerate() {
                    out.push_str(&format!("\n{}. {} {}", rank + 1, entry.player_name, entry.score));
                }
                out
            }
            Err(err) => {
                log::warn!("Leaderboard load failed: {:#}", err);
                "Failed to load leaderboard".to_string()
            }
        }
    }

    fn name_command(&mut self, name: &str) -> String {
        if name.is_empty() {
            return match &self.settings.player_name {
                Some(player) => format!("Player name: {}", player),
                None => "No player name set. Type \"name <player>\" to set one.".to_string(),
            };
        }
        let name: String = name.chars().take(MAX_NAME_LEN).collect();
        self.settings.player_name = Some(name.clone());
        if let Some(path) = &self.settings_path {
            if let Err(err) = self.settings.save(path) {
                log::warn!("Settings not saved: {:#}", err);
            }
        }
        format!("Player name set to {}", name)
    }
}
