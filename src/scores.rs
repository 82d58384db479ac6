use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::games::GameId;

pub const SCORES_FILE: &str = "scores.json";

/// Best score per game. Unplayed games read as zero.
pub trait HighScoreStore {
    fn high_score(&self, game: GameId) -> u32;
    fn set_high_score(&mut self, game: GameId, score: u32);
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HighScores {
    scores: BTreeMap<GameId, u32>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl HighScores {
    /// Scores that never touch the disk.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing or unreadable file starts an empty table
    /// that will be written back to the same place.
    pub fn load(path: &Path) -> Self {
        let mut scores = match Self::read(path) {
            Ok(Some(scores)) => {
                log::info!("Loaded {} high scores from {}", scores.scores.len(), path.display());
                scores
            }
            Ok(None) => {
                log::info!("No high scores found, starting fresh");
                Self::default()
            }
            Err(err) => {
                log::warn!("{:#}; starting fresh", err);
                Self::default()
            }
        };
        scores.path = Some(path.to_path_buf());
        scores
    }

    fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let scores = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(scores))
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (GameId, u32)> + '_ {
        GameId::all().iter().map(|game| (*game, self.high_score(*game)))
    }
}

impl HighScoreStore for HighScores {
    fn high_score(&self, game: GameId) -> u32 {
        self.scores.get(&game).copied().unwrap_or(0)
    }

    fn set_high_score(&mut self, game: GameId, score: u32) {
        self.scores.insert(game, score);
        if let Err(err) = self.save() {
            log::warn!("High scores not saved: {:#}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("termcade-scores-{}-{}", name, std::process::id()));
        let _ = fs::create_dir_all(&dir);
        dir.join(SCORES_FILE)
    }

    #[test]
    fn test_unplayed_game_is_zero() {
        let scores = HighScores::in_memory();
        for game in GameId::all() {
            assert_eq!(scores.high_score(*game), 0);
        }
    }

    #[test]
    fn test_scores_survive_reload() {
        let path = temp_path("reload");
        let _ = fs::remove_file(&path);

        let mut scores = HighScores::load(&path);
        scores.set_high_score(GameId::Tetris, 400);
        scores.set_high_score(GameId::Snake, 9);

        let reloaded = HighScores::load(&path);
        assert_eq!(reloaded.high_score(GameId::Tetris), 400);
        assert_eq!(reloaded.high_score(GameId::Snake), 9);
        assert_eq!(reloaded.high_score(GameId::Pong), 0);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"tetris\""));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").unwrap();

        let mut scores = HighScores::load(&path);
        assert_eq!(scores.high_score(GameId::Invaders), 0);

        // The next write replaces the corrupt file.
        scores.set_high_score(GameId::Invaders, 30);
        assert_eq!(HighScores::load(&path).high_score(GameId::Invaders), 30);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_iter_lists_every_game() {
        let mut scores = HighScores::in_memory();
        scores.set_high_score(GameId::Pong, 3);
        let listed: Vec<_> = scores.iter().collect();
        assert_eq!(listed.len(), GameId::all().len());
        assert!(listed.contains(&(GameId::Pong, 3)));
    }
}
