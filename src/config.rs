//! Dashboard Configuration
//!
//! Stored in `~/.config/pipedash/config.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`PIPEDASH_INPUT_MODE`, `PIPEDASH_AUTO_TRAIN`)
//! 2. Config file
//! 3. Defaults

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};

/// Upper bound on any loop's poll period, so `running=false` is seen promptly
pub const MAX_POLL_MS: u64 = 100;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardConfig {
    #[serde(default)]
    pub auto_train: AutoTrainSettings,

    #[serde(default)]
    pub refresh: RefreshSettings,

    #[serde(default)]
    pub display: DisplaySettings,

    #[serde(default)]
    pub input: InputSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AutoTrainSettings {
    pub enabled: bool,
    pub required_artifacts: BTreeSet<String>,
}

impl Default for AutoTrainSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            required_artifacts: ["train.parquet", "validation.parquet", "live.parquet"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefreshSettings {
    /// Render interval while any operation is running
    pub fast_ms: u64,
    /// Render interval while everything is idle
    pub slow_ms: u64,
    /// Scheduler wake-up step between cadence checks
    pub tick_ms: u64,
    /// Monitor loop tick
    pub monitor_tick_ms: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            fast_ms: 200,
            slow_ms: 1000,
            tick_ms: 50,
            monitor_tick_ms: 100,
        }
    }
}

impl RefreshSettings {
    pub fn fast(&self) -> Duration {
        Duration::from_millis(self.fast_ms)
    }

    pub fn slow(&self) -> Duration {
        Duration::from_millis(self.slow_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn monitor_tick(&self) -> Duration {
        Duration::from_millis(self.monitor_tick_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplaySettings {
    pub max_events: usize,
    /// Emit the key help into the event log at startup
    pub help_on_start: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            max_events: 100,
            help_on_start: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Unbuffered, no-echo keystrokes
    #[default]
    Raw,
    /// Line-buffered stdin (degraded)
    Line,
}

impl std::str::FromStr for InputMode {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "line" => Ok(Self::Line),
            other => Err(DashError::ConfigError {
                reason: format!("unknown input mode '{}' (expected raw or line)", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputSettings {
    pub mode: InputMode,
    pub poll_ms: u64,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            mode: InputMode::Raw,
            poll_ms: 10,
        }
    }
}

impl InputSettings {
    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

impl DashboardConfig {
    /// Returns `~/.config/pipedash/` on Unix, `%APPDATA%/pipedash/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pipedash")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from a file.
    ///
    /// Returns default config if the file doesn't exist, an error if it
    /// exists but is malformed or fails validation.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| DashError::ConfigError {
            reason: format!("Failed to read {}: {}", path.display(), e),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| DashError::ConfigError {
            reason: format!("Failed to parse {}: {}", path.display(), e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables
    pub fn with_env(mut self) -> Result<Self> {
        if let Ok(mode) = std::env::var("PIPEDASH_INPUT_MODE") {
            if !mode.is_empty() {
                self.input.mode = mode.parse()?;
            }
        }

        if let Ok(flag) = std::env::var("PIPEDASH_AUTO_TRAIN") {
            self.auto_train.enabled = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(DashError::ConfigError {
                        reason: format!("PIPEDASH_AUTO_TRAIN has invalid value '{}'", other),
                    })
                }
            };
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(DashError::ConfigError { reason });
        let r = &self.refresh;

        if r.fast_ms == 0 || r.slow_ms == 0 {
            return invalid("refresh intervals must be non-zero".into());
        }
        if r.fast_ms > r.slow_ms {
            return invalid(format!(
                "refresh.fast_ms ({}) must not exceed refresh.slow_ms ({})",
                r.fast_ms, r.slow_ms
            ));
        }
        for (name, value) in [
            ("refresh.tick_ms", r.tick_ms),
            ("refresh.monitor_tick_ms", r.monitor_tick_ms),
            ("input.poll_ms", self.input.poll_ms),
        ] {
            if value == 0 || value > MAX_POLL_MS {
                return invalid(format!(
                    "{} must be between 1 and {} (got {})",
                    name, MAX_POLL_MS, value
                ));
            }
        }
        if self.display.max_events == 0 {
            return invalid("display.max_events must be at least 1".into());
        }
        Ok(())
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DashError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = DashboardConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.auto_train.enabled);
        assert_eq!(config.auto_train.required_artifacts.len(), 3);
        assert_eq!(config.refresh.fast(), Duration::from_millis(200));
        assert_eq!(config.refresh.slow(), Duration::from_secs(1));
        assert_eq!(config.input.mode, InputMode::Raw);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[auto_train]
required_artifacts = ["a.parquet", "b.parquet"]

[input]
mode = "line"
"#
        )
        .unwrap();

        let config = DashboardConfig::load_from(file.path()).unwrap();
        assert!(config.auto_train.enabled);
        assert_eq!(config.auto_train.required_artifacts.len(), 2);
        assert_eq!(config.input.mode, InputMode::Line);
        assert_eq!(config.input.poll_ms, 10);
        assert_eq!(config.refresh, RefreshSettings::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[refresh\nfast_ms = ").unwrap();
        let err = DashboardConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, DashError::ConfigError { .. }));
    }

    #[test]
    fn test_fast_slower_than_slow_rejected() {
        let mut config = DashboardConfig::default();
        config.refresh.fast_ms = 2000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_above_bound_rejected() {
        let mut config = DashboardConfig::default();
        config.input.poll_ms = 250;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("input.poll_ms"));
    }

    #[test]
    fn test_toml_round_trip_keeps_values() {
        let mut config = DashboardConfig::default();
        config.display.max_events = 42;
        let text = config.to_toml().unwrap();
        let back: DashboardConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.display.max_events, 42);
    }

    #[test]
    fn test_input_mode_parse() {
        assert_eq!("RAW".parse::<InputMode>().unwrap(), InputMode::Raw);
        assert_eq!(" line ".parse::<InputMode>().unwrap(), InputMode::Line);
        assert!("cooked".parse::<InputMode>().is_err());
    }
}
