use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_FRAME_MS: u64 = 16;
pub const MAX_FRAME_MS: u64 = 1000;

/// Persistent user preferences. Command-line flags override these for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name submitted with leaderboard scores.
    pub player_name: Option<String>,
    /// Milliseconds between frames.
    pub frame_ms: u64,
    /// Fixed engine seed, for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            player_name: None,
            frame_ms: DEFAULT_FRAME_MS,
            seed: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Self {
        let mut settings = Self::read_or_default(path);
        settings.frame_ms = settings.frame_ms.clamp(1, MAX_FRAME_MS);
        settings
    }

    fn read_or_default(path: &Path) -> Self {
        match Self::read(path) {
            Ok(Some(settings)) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(err) => {
                log::warn!("{:#}; using default settings", err);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(settings))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Settings saved");
        Ok(())
    }
}

/// Directory holding scores, settings and the log: next to the executable,
/// or the working directory when that cannot be found.
pub fn default_data_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("termcade-settings-{}-{}", name, std::process::id()));
        let _ = fs::create_dir_all(&dir);
        dir.join(SETTINGS_FILE)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);
        assert_eq!(Settings::load(&path), Settings::default());
        assert_eq!(Settings::default().frame_ms, DEFAULT_FRAME_MS);
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("save");
        let settings = Settings {
            player_name: Some("ada".into()),
            frame_ms: 20,
            seed: Some(42),
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_frame_period_is_clamped() {
        let path = temp_path("clamp");
        fs::write(&path, r#"{ "frame_ms": 60000 }"#).unwrap();
        assert_eq!(Settings::load(&path).frame_ms, MAX_FRAME_MS);
        fs::write(&path, r#"{ "frame_ms": 0 }"#).unwrap();
        assert_eq!(Settings::load(&path).frame_ms, 1);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("partial");
        fs::write(&path, r#"{ "player_name": "kay" }"#).unwrap();
        let settings = Settings::load(&path);
        assert_eq!(settings.player_name.as_deref(), Some("kay"));
        assert_eq!(settings.frame_ms, DEFAULT_FRAME_MS);
        let _ = fs::remove_file(&path);
    }
}
