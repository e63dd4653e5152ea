//! TOML-based application configuration.
//!
//! Stores:
//! - The event being counted down to (title, start, length, venue)
//! - Backend API location and request timeout
//! - Countdown tick tuning and startup sync
//! - Live stats refresh interval
//!
//! Configuration is stored at `~/.config/blitzweek/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::api::{ApiClient, DEFAULT_BASE_URL};
use crate::countdown::EventWindow;
use crate::error::{ConfigError, CoreError};

/// The event being counted down to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default = "default_title")]
    pub title: String,
    /// Start instant, RFC 3339 with offset.
    #[serde(default = "default_start")]
    pub start: DateTime<FixedOffset>,
    #[serde(default = "default_duration_hours")]
    pub duration_hours: u32,
    #[serde(default = "default_location")]
    pub location: String,
}

/// Backend API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownConfig {
    /// Slack added after each second boundary before ticking.
    #[serde(default = "default_tick_epsilon_ms")]
    pub tick_epsilon_ms: u64,
    #[serde(default = "default_true")]
    pub sync_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/blitzweek/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub event: EventConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub countdown: CountdownConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

fn default_title() -> String {
    "ScaleUp Blitz Week".into()
}

fn default_start() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(5 * 3600 + 30 * 60)
        .and_then(|ist| ist.with_ymd_and_hms(2025, 1, 25, 10, 0, 0).single())
        .unwrap_or_default()
}

fn default_duration_hours() -> u32 {
    48
}

fn default_location() -> String {
    "IIT Bombay".into()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_tick_epsilon_ms() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

fn default_refresh_secs() -> u64 {
    30
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            start: default_start(),
            duration_hours: default_duration_hours(),
            location: default_location(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            tick_epsilon_ms: default_tick_epsilon_ms(),
            sync_on_start: true,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh_secs(),
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
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }
            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => value
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                serde_json::Value::Object(_) => return Err(unknown()),
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }
        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
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

    /// Set a value by dot-separated key without saving.
    ///
    /// The new value keeps the type of the old one and the result must
    /// still describe a valid event window.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated
            .event_window()
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and persist to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Every leaf key with its current value.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// The configured event as a validated window.
    pub fn event_window(&self) -> Result<EventWindow, CoreError> {
        Ok(EventWindow::from_duration_hours(
            self.event.start.with_timezone(&chrono::Utc),
            self.event.duration_hours,
        )?)
    }

    pub fn tick_epsilon(&self) -> Duration {
        Duration::from_millis(self.countdown.tick_epsilon_ms)
    }

    pub fn stats_refresh(&self) -> Duration {
        Duration::from_secs(self.stats.refresh_secs.max(1))
    }

    /// HTTP client for the configured backend.
    pub fn api_client(&self) -> Result<ApiClient, CoreError> {
        Ok(ApiClient::new(
            &self.api.base_url,
            Duration::from_secs(self.api.timeout_secs),
        )?)
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
        assert_eq!(parsed.event.start, cfg.event.start);
        assert_eq!(parsed.event.duration_hours, 48);
        assert_eq!(parsed.api.timeout_secs, 15);
    }

    #[test]
    fn default_event_starts_at_ten_ist() {
        let cfg = Config::default();
        assert_eq!(cfg.event.start.to_rfc3339(), "2025-01-25T10:00:00+05:30");
        let window = cfg.event_window().unwrap();
        assert_eq!(window.start().to_rfc3339(), "2025-01-25T04:30:00+00:00");
        assert_eq!(window.duration(), chrono::Duration::hours(48));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str("[event]\nduration_hours = 24\n").unwrap();
        assert_eq!(cfg.event.duration_hours, 24);
        assert_eq!(cfg.event.title, "ScaleUp Blitz Week");
        assert_eq!(cfg.stats.refresh_secs, 30);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("event.location").as_deref(), Some("IIT Bombay"));
        assert_eq!(cfg.get("countdown.sync_on_start").as_deref(), Some("true"));
        assert_eq!(cfg.get("api.timeout_secs").as_deref(), Some("15"));
        assert!(cfg.get("event.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_value_preserves_types() {
        let mut cfg = Config::default();
        cfg.set_value("countdown.sync_on_start", "false").unwrap();
        cfg.set_value("stats.refresh_secs", "10").unwrap();
        cfg.set_value("event.title", "Ignite Night").unwrap();
        assert!(!cfg.countdown.sync_on_start);
        assert_eq!(cfg.stats.refresh_secs, 10);
        assert_eq!(cfg.event.title, "Ignite Night");
    }

    #[test]
    fn set_value_rejects_bad_input() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_value("event.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set_value("event", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set_value("stats.refresh_secs", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set_value("event.start", "next tuesday"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set_value("event.duration_hours", "0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg.event.duration_hours, 48);
    }

    #[test]
    fn set_value_accepts_new_start() {
        let mut cfg = Config::default();
        cfg.set_value("event.start", "2026-02-01T09:00:00+05:30")
            .unwrap();
        assert_eq!(
            cfg.event_window().unwrap().start().to_rfc3339(),
            "2026-02-01T03:30:00+00:00"
        );
    }

    #[test]
    fn entries_lists_every_leaf() {
        let keys: Vec<String> = Config::default()
            .entries()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        for expected in [
            "event.title",
            "event.start",
            "api.base_url",
            "countdown.tick_epsilon_ms",
            "stats.refresh_secs",
        ] {
            assert!(keys.iter().any(|k| k == expected), "missing {expected}");
        }
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.event.location, "IIT Bombay");
    }

    #[test]
    fn save_then_load_keeps_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set_value("api.base_url", "https://blitz.example/api").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api.base_url, "https://blitz.example/api");
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[event\nbroken").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
