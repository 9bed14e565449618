//! Configuration management module.

use chrono::Weekday;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::models::{AgentSelection, Thresholds};

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub liveness: LivenessConfig,
    pub refresh: RefreshConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

/// Presence backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer token passed through to the backend, empty for anonymous access.
    #[serde(default)]
    pub token: String,
    /// Request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

/// Agent health thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessConfig {
    pub healthy_seconds: i64,
    pub degraded_seconds: i64,
    /// Sample picked when several agents report for a site.
    #[serde(default)]
    pub selection: AgentSelection,
}

/// Polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    pub interval_secs: u64,
}

/// Report interpretation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// IANA timezone all timestamps and day boundaries are interpreted in.
    pub timezone: String,
    /// Hours from which a day counts as a full day.
    pub full_day_hours: f64,
    #[serde(default = "default_weekend")]
    pub weekend: Vec<Weekday>,
}

fn default_weekend() -> Vec<Weekday> {
    vec![Weekday::Sat, Weekday::Sun]
}

/// Log output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files, empty to log to stderr only.
    #[serde(default)]
    pub directory: String,
}

impl AppConfig {
    /// Get config file path (platform config directory, else next to the executable).
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "presence-engine")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            })
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => ConfigLoadResult::Loaded(config),
                    Err(e) => ConfigLoadResult::Invalid(e),
                },
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "API base URL must start with http:// or https://".to_string(),
            ));
        }
        if self.api.timeout_secs < 1 {
            return Err(ConfigError::Validation("API timeout must be at least 1 second".to_string()));
        }
        self.thresholds()?;
        if self.refresh.interval_secs < 1 {
            return Err(ConfigError::Validation(
                "Refresh interval must be at least 1 second".to_string(),
            ));
        }
        self.timezone()?;
        if !(self.report.full_day_hours > 0.0 && self.report.full_day_hours <= 24.0) {
            return Err(ConfigError::Validation(
                "Full day hours must be greater than 0 and at most 24".to_string(),
            ));
        }
        Ok(())
    }

    /// Liveness thresholds as a validated value.
    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        Thresholds::new(self.liveness.healthy_seconds, self.liveness.degraded_seconds)
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }

    /// Configured reporting timezone.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.report
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Validation(format!("Unknown timezone '{}'", self.report.timezone)))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl ApiConfig {
    /// Token to send, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        let token = self.token.trim();
        (!token.is_empty()).then_some(token)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            healthy_seconds: thresholds.healthy_seconds(),
            degraded_seconds: thresholds.degraded_seconds(),
            selection: AgentSelection::default(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 15 }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            full_day_hours: 8.0,
            weekend: default_weekend(),
        }
    }
}
