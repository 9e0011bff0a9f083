use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::emit::DEFAULT_CHUNK_LIMIT;
use super::report::ReportStyle;
use super::session::SessionConfig;

/// Application settings, persisted as `settings.json`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub log_dir: PathBuf,
    /// Follow only this character's log. `None` follows whichever log was written last.
    pub character: Option<String>,
    pub combat_timeout_seconds: i64,
    pub spell_timeout_seconds: i64,
    /// How often the log directory is rescanned for a newer log.
    pub heartbeat_seconds: u64,
    pub poll_interval_millis: u64,
    pub report_style: ReportStyle,
    pub chunk_limit: usize,
    pub history_limit: usize,
    pub player_cache: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());

        Self {
            log_dir: PathBuf::from(home).join("EverQuest").join("Logs"),
            character: None,
            combat_timeout_seconds: 30,
            spell_timeout_seconds: 12,
            heartbeat_seconds: 60,
            poll_interval_millis: 250,
            report_style: ReportStyle::Full,
            chunk_limit: DEFAULT_CHUNK_LIMIT,
            history_limit: 100,
            player_cache: None,
        }
    }
}

impl Settings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            combat_timeout_secs: self.combat_timeout_seconds,
            spell_timeout_secs: self.spell_timeout_seconds,
            report_style: self.report_style,
            history_limit: self.history_limit,
        }
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis.max(1))
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(app_config_dir: PathBuf) -> Self {
        Self {
            config_path: app_config_dir.join("settings.json"),
        }
    }

    /// Default config directory: `$HOME/.config/eqtracker`.
    pub fn default_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".config").join("eqtracker")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.config_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default()
    }

    pub fn load(&self) -> Settings {
        if self.config_path.exists() {
            if let Ok(content) = fs::read_to_string(&self.config_path) {
                match serde_json::from_str(&content) {
                    Ok(settings) => return settings,
                    Err(e) => log::warn!("Ignoring {}: {}", self.config_path.display(), e),
                }
            }
        }
        Settings::default()
    }

    pub fn save(&self, settings: &Settings) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content)
    }

    /// Where the player cache lives unless the settings name a file.
    pub fn player_cache_path(&self, settings: &Settings) -> PathBuf {
        settings
            .player_cache
            .clone()
            .unwrap_or_else(|| self.config_dir().join("players.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().to_path_buf());

        let default = manager.load();
        assert_eq!(default.combat_timeout_seconds, 30);
        assert_eq!(default.spell_timeout_seconds, 12);

        let new_settings = Settings {
            log_dir: PathBuf::from("/tmp/logs"),
            character: Some("Soandso".to_string()),
            report_style: ReportStyle::Both,
            combat_timeout_seconds: 45,
            ..Settings::default()
        };

        manager.save(&new_settings).unwrap();
        let loaded = manager.load();

        assert_eq!(loaded, new_settings);
        assert_eq!(loaded.session_config().combat_timeout_secs, 45);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("settings.json"),
            r#"{ "spell_timeout_seconds": 20, "report_style": "Condensed" }"#,
        )
        .unwrap();

        let loaded = ConfigManager::new(dir.path().to_path_buf()).load();
        assert_eq!(loaded.spell_timeout_seconds, 20);
        assert_eq!(loaded.report_style, ReportStyle::Condensed);
        assert_eq!(loaded.heartbeat_seconds, 60);
    }

    #[test]
    fn test_player_cache_path() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().to_path_buf());
        let mut settings = Settings::default();
        assert_eq!(manager.player_cache_path(&settings), dir.path().join("players.json"));

        settings.player_cache = Some(PathBuf::from("/tmp/p.json"));
        assert_eq!(manager.player_cache_path(&settings), PathBuf::from("/tmp/p.json"));
    }
}
