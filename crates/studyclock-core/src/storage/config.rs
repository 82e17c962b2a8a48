//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Which user id the CLI acts for
//! - Engine timing policy (settle delay, duration floor, auto-advance)
//! - Alert preferences
//! - Reporting windows
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::EngineOptions;

/// Session engine policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Pause between a block finishing and the next one starting.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Live adjustments never shrink a block below this many minutes.
    #[serde(default = "default_min_block_minutes")]
    pub min_block_minutes: u32,
    #[serde(default = "default_true")]
    pub auto_advance: bool,
    /// Subtract paused time from the logged actual minutes.
    #[serde(default)]
    pub exclude_paused_time: bool,
}

/// Alert configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub warning_5min: bool,
    #[serde(default = "default_true")]
    pub warning_2min: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_subject_window_days")]
    pub subject_window_days: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

// Default functions
fn default_user_id() -> String {
    "local".into()
}
fn default_settle_delay_ms() -> u64 {
    3500
}
fn default_min_block_minutes() -> u32 {
    5
}
fn default_subject_window_days() -> u32 {
    7
}
fn default_true() -> bool {
    true
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            min_block_minutes: default_min_block_minutes(),
            auto_advance: true,
            exclude_paused_time: false,
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            warning_5min: true,
            warning_2min: true,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            subject_window_days: default_subject_window_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            timer: TimerConfig::default(),
            alerts: AlertsConfig::default(),
            stats: StatsConfig::default(),
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
        if parts.peek().map_or(true, |p| p.is_empty()) {
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
                            .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                tracing::debug!(path = %path.display(), "config loaded");
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                tracing::info!(path = %path.display(), "wrote default config");
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
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

    /// Set a value by dotted key, type-checked against the current value.
    /// Does not save; call [`Config::save`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Engine policy derived from the timer and alert sections.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            settle_delay: Duration::from_millis(self.timer.settle_delay_ms),
            min_block_minutes: self.timer.min_block_minutes.max(1),
            auto_advance: self.timer.auto_advance,
            exclude_paused_time: self.timer.exclude_paused_time,
            warn_at_5min: self.alerts.warning_5min,
            warn_at_2min: self.alerts.warning_2min,
        }
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
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let parsed: Config = toml::from_str("user_id = \"usr_demo\"\n[timer]\nauto_advance = false\n").unwrap();
        assert_eq!(parsed.user_id, "usr_demo");
        assert!(!parsed.timer.auto_advance);
        assert_eq!(parsed.timer.settle_delay_ms, 3500);
        assert_eq!(parsed.timer.min_block_minutes, 5);
        assert!(parsed.alerts.warning_2min);
        assert_eq!(parsed.stats.subject_window_days, 7);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.settle_delay_ms").as_deref(), Some("3500"));
        assert_eq!(cfg.get("alerts.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("user_id").as_deref(), Some("local"));
        assert!(cfg.get("timer.missing_key").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.set("timer.min_block_minutes", "10").unwrap();
        cfg.set("alerts.warning_5min", "false").unwrap();
        cfg.set("user_id", "usr_demo").unwrap();
        assert_eq!(cfg.timer.min_block_minutes, 10);
        assert!(!cfg.alerts.warning_5min);
        assert_eq!(cfg.user_id, "usr_demo");
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("timer.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set("timer", "1"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(
            cfg.set("alerts.enabled", "not_a_bool"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.set("timer.settle_delay_ms", "-4").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg, Config::default());

        let mut changed = cfg.clone();
        changed.set("timer.settle_delay_ms", "100").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().timer.settle_delay_ms, 100);
    }

    #[test]
    fn engine_options_follow_config() {
        let mut cfg = Config::default();
        cfg.timer.min_block_minutes = 0;
        cfg.alerts.warning_2min = false;
        let opts = cfg.engine_options();
        assert_eq!(opts.settle_delay, Duration::from_millis(3500));
        assert_eq!(opts.min_block_minutes, 1);
        assert!(!opts.warn_at_2min);
    }
}
