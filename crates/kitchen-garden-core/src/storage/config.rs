//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Pomodoro durations, session count and cosmetic toggles
//! - Clipboard history limits and poll interval
//!
//! Configuration is stored at `~/.config/kitchen-garden/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::clipboard::ClipboardLimits;
use crate::error::{ConfigError, Result};
use crate::timer::TimerSettings;

/// Pomodoro defaults applied to a fresh timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PomodoroConfig {
    #[serde(default = "default_work_duration_secs")]
    pub work_duration_secs: u64,
    #[serde(default = "default_break_duration_secs")]
    pub break_duration_secs: u64,
    #[serde(default = "default_total_work_sessions")]
    pub total_work_sessions: u32,
    #[serde(default)]
    pub focus_mode_enabled: bool,
    #[serde(default)]
    pub falling_tomatoes_enabled: bool,
}

/// Clipboard history configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardConfig {
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_max_pinned")]
    pub max_pinned: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/kitchen-garden/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pomodoro: PomodoroConfig,
    #[serde(default)]
    pub clipboard: ClipboardConfig,
}

// Default functions
fn default_work_duration_secs() -> u64 {
    25 * 60
}
fn default_break_duration_secs() -> u64 {
    5 * 60
}
fn default_total_work_sessions() -> u32 {
    4
}
fn default_max_items() -> usize {
    100
}
fn default_max_pinned() -> usize {
    10
}
fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            work_duration_secs: default_work_duration_secs(),
            break_duration_secs: default_break_duration_secs(),
            total_work_sessions: default_total_work_sessions(),
            focus_mode_enabled: false,
            falling_tomatoes_enabled: false,
        }
    }
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            max_pinned: default_max_pinned(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)
                    .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json)?;
        Ok(())
    }

    /// Timer settings built from the `[pomodoro]` section, clamped.
    pub fn timer_settings(&self) -> TimerSettings {
        let mut settings = TimerSettings::new(
            self.pomodoro.total_work_sessions,
            self.pomodoro.work_duration_secs,
            self.pomodoro.break_duration_secs,
        );
        settings.set_focus_mode_enabled(self.pomodoro.focus_mode_enabled);
        settings.set_falling_tomatoes_enabled(self.pomodoro.falling_tomatoes_enabled);
        settings
    }

    pub fn clipboard_limits(&self) -> ClipboardLimits {
        ClipboardLimits::new(self.clipboard.max_items, self.clipboard.max_pinned)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("using default config: {e}");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.pomodoro.work_duration_secs, 1500);
        assert_eq!(parsed.clipboard.max_items, 100);
        assert_eq!(parsed.clipboard.max_pinned, 10);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("pomodoro.total_work_sessions").as_deref(), Some("4"));
        assert_eq!(cfg.get("pomodoro.focus_mode_enabled").as_deref(), Some("false"));
        assert!(cfg.get("pomodoro.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("pomodoro.work_duration_secs", "600").unwrap();
        cfg.set("pomodoro.falling_tomatoes_enabled", "true").unwrap();
        assert_eq!(cfg.pomodoro.work_duration_secs, 600);
        assert!(cfg.pomodoro.falling_tomatoes_enabled);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("pomodoro.nonexistent_key", "1").unwrap_err();
        assert!(err.to_string().contains("unknown config key"));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("pomodoro.focus_mode_enabled", "not_a_bool").is_err());
        assert!(cfg.set("clipboard.max_items", "-3").is_err());
    }

    #[test]
    fn timer_settings_are_clamped() {
        let mut cfg = Config::default();
        cfg.pomodoro.work_duration_secs = 10;
        cfg.pomodoro.total_work_sessions = 50;
        let settings = cfg.timer_settings();
        assert_eq!(settings.work_duration_secs(), 60);
        assert_eq!(settings.total_work_sessions(), 10);
    }

    #[test]
    fn clipboard_limits_are_clamped() {
        let mut cfg = Config::default();
        cfg.set("clipboard.max_pinned", "50").unwrap();
        cfg.set("clipboard.max_items", "100000").unwrap();
        let limits = cfg.clipboard_limits();
        assert_eq!(limits.max_pinned, 10);
        assert_eq!(limits.max_items, 100);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str("[clipboard]\nmax_items = 20\n").unwrap();
        assert_eq!(cfg.clipboard.max_items, 20);
        assert_eq!(cfg.clipboard.max_pinned, 10);
        assert_eq!(cfg.pomodoro.break_duration_secs, 300);
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.pomodoro.total_work_sessions, 4);
        assert!(path.exists());

        let mut cfg = cfg;
        cfg.set("clipboard.max_pinned", "5").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().clipboard.max_pinned, 5);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "pomodoro = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
