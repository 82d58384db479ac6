//! Named score table shared by every player on this machine.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::games::GameId;

pub const LEADERBOARD_FILE: &str = "leaderboard.json";
/// Entries kept per game.
pub const MAX_ENTRIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub score: u32,
}

pub trait Leaderboard {
    fn submit_score(&mut self, game: GameId, score: u32, player: &str) -> Result<()>;
    /// Best entries first, at most `MAX_ENTRIES`.
    fn top_scores(&self, game: GameId) -> Result<Vec<LeaderboardEntry>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Table {
    games: Vec<GameTable>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GameTable {
    game: GameId,
    entries: Vec<LeaderboardEntry>,
}

impl Table {
    fn entries_mut(&mut self, game: GameId) -> &mut Vec<LeaderboardEntry> {
        let idx = match self.games.iter().position(|t| t.game == game) {
            Some(idx) => idx,
            None => {
                self.games.push(GameTable { game, entries: Vec::new() });
                self.games.len() - 1
            }
        };
        &mut self.games[idx].entries
    }

    fn insert(&mut self, game: GameId, entry: LeaderboardEntry) {
        let entries = self.entries_mut(game);
        // Ties go below the existing entries.
        let pos = entries.iter().position(|e| entry.score > e.score);
        match pos {
            Some(i) => entries.insert(i, entry),
            None => entries.push(entry),
        }
        entries.truncate(MAX_ENTRIES);
    }
}

/// JSON-file leaderboard. The file is re-read on every call so that two
/// running copies see each other's submissions.
pub struct LocalLeaderboard {
    path: PathBuf,
}

impl LocalLeaderboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn read(&self) -> Result<Table> {
        if !self.path.exists() {
            return Ok(Table::default());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let table = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(table)
    }

    fn write(&self, table: &Table) -> Result<()> {
        let text = serde_json::to_string_pretty(table)?;
        fs::write(&self.path, text)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl Leaderboard for LocalLeaderboard {
    fn submit_score(&mut self, game: GameId, score: u32, player: &str) -> Result<()> {
        let player = player.trim();
        if player.is_empty() {
            bail!("Player name is empty");
        }
        let mut table = self.read()?;
        table.insert(game, LeaderboardEntry { player_name: player.to_string(), score });
        self.write(&table)?;
        log::info!("Leaderboard: {} scored {} in {}", player, score, game);
        Ok(())
    }

    fn top_scores(&self, game: GameId) -> Result<Vec<LeaderboardEntry>> {
        let table = self.read()?;
        let mut entries = table
            .games
            .into_iter()
            .find(|t| t.game == game)
            .map(|t| t.entries)
            .unwrap_or_default();
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(MAX_ENTRIES);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(name: &str) -> LocalLeaderboard {
        let dir = std::env::temp_dir().join(format!("termcade-board-{}-{}", name, std::process::id()));
        let _ = fs::create_dir_all(&dir);
        let path = dir.join(LEADERBOARD_FILE);
        let _ = fs::remove_file(&path);
        LocalLeaderboard::new(path)
    }

    #[test]
    fn test_empty_board_has_no_scores() {
        let board = board("empty");
        assert!(board.top_scores(GameId::Snake).unwrap().is_empty());
    }

    #[test]
    fn test_scores_sorted_and_capped() {
        let mut board = board("capped");
        for score in [5, 40, 12, 7, 33, 1, 90, 18, 25, 60, 2, 77] {
            board.submit_score(GameId::Tetris, score, "ada").unwrap();
        }
        let top = board.top_scores(GameId::Tetris).unwrap();
        let scores: Vec<u32> = top.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![90, 77, 60, 40, 33, 25, 18, 12, 7, 5]);
        let _ = fs::remove_file(board.path());
    }

    #[test]
    fn test_games_are_kept_apart() {
        let mut board = board("apart");
        board.submit_score(GameId::Pong, 4, "lin").unwrap();
        board.submit_score(GameId::Snake, 11, "kay").unwrap();

        let pong = board.top_scores(GameId::Pong).unwrap();
        assert_eq!(pong, vec![LeaderboardEntry { player_name: "lin".into(), score: 4 }]);
        assert!(board.top_scores(GameId::Invaders).unwrap().is_empty());
        let _ = fs::remove_file(board.path());
    }

    #[test]
    fn test_blank_player_is_rejected() {
        let mut board = board("blank");
        assert!(board.submit_score(GameId::Snake, 3, "  ").is_err());
        assert!(board.top_scores(GameId::Snake).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let board = board("corrupt");
        fs::write(board.path(), "[[[").unwrap();
        assert!(board.top_scores(GameId::Snake).is_err());
        let _ = fs::remove_file(board.path());
    }
}
