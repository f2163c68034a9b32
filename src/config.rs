//! Configuration loaded from an optional TOML file
//!
//! Every section and key is optional; anything missing falls back to the
//! defaults in `common::constants`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::common::constants::{
    DEFAULT_API_BINARY, DEFAULT_BACKOFF_FACTOR, DEFAULT_INITIAL_DELAY_MS, DEFAULT_LEVEL_FILTER,
    DEFAULT_LOG_CLEANUP_DAYS, DEFAULT_MAX_DELAY_MS, DEFAULT_TOP_N, DEFAULT_TRANSIENT_RETRY_DELAY_MS,
};
use crate::logging::{LogRotation, LoggingConfig};
use crate::polling::PollConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ApiTomlConfig {
    pub binary: Option<String>,
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PollingTomlConfig {
    pub initial_delay_ms: Option<u64>,
    pub backoff_factor: Option<f64>,
    pub max_delay_ms: Option<u64>,
    pub transient_retry_delay_ms: Option<u64>,
    pub deadline_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ReportTomlConfig {
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LoggingTomlConfig {
    pub log_dir: Option<String>,
    pub level_filter: Option<String>,
    pub rotation: Option<String>, // "daily" or "hourly"
    pub file_json_format: Option<bool>,
    pub cleanup_days: Option<u32>,
}

/// Full TOML configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    pub api: Option<ApiTomlConfig>,
    pub polling: Option<PollingTomlConfig>,
    pub report: Option<ReportTomlConfig>,
    pub logging: Option<LoggingTomlConfig>,
}

/// Remote command settings
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    pub binary: String,
    /// Where intermediate JSON answers are written; a scratch directory when `None`
    pub work_dir: Option<PathBuf>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            binary: DEFAULT_API_BINARY.to_string(),
            work_dir: None,
        }
    }
}

/// Resolved application configuration
#[derive(Debug, Clone)]
pub struct LociConfig {
    pub api: ApiSettings,
    pub polling: PollConfig,
    pub top_n: usize,
    pub logging: LoggingConfig,
    pub log_cleanup_days: u32,
}

impl Default for LociConfig {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            polling: PollConfig::default(),
            top_n: DEFAULT_TOP_N,
            logging: LoggingConfig::default(),
            log_cleanup_days: DEFAULT_LOG_CLEANUP_DAYS,
        }
    }
}

impl LociConfig {
    /// Load configuration from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let toml_config: TomlConfig = toml::from_str(content)?;
        let config = Self::from_toml_config(toml_config)?;
        config.polling.validate()?;
        Ok(config)
    }

    fn from_toml_config(toml_config: TomlConfig) -> Result<Self, ConfigError> {
        let api = toml_config.api.unwrap_or_default();
        let polling = toml_config.polling.unwrap_or_default();
        let report = toml_config.report.unwrap_or_default();
        let logging = toml_config.logging.unwrap_or_default();

        let rotation = match logging.rotation.as_deref() {
            None | Some("daily") => LogRotation::Daily,
            Some("hourly") => LogRotation::Hourly,
            Some(other) => {
                return Err(ConfigError::Invalid(format!(
                    "unknown log rotation '{}', expected 'daily' or 'hourly'",
                    other
                )))
            }
        };

        Ok(Self {
            api: ApiSettings {
                binary: api.binary.unwrap_or_else(|| DEFAULT_API_BINARY.to_string()),
                work_dir: api.work_dir,
            },
            polling: PollConfig {
                initial_delay: Duration::from_millis(polling.initial_delay_ms.unwrap_or(DEFAULT_INITIAL_DELAY_MS)),
                backoff_factor: polling.backoff_factor.unwrap_or(DEFAULT_BACKOFF_FACTOR),
                max_delay: Duration::from_millis(polling.max_delay_ms.unwrap_or(DEFAULT_MAX_DELAY_MS)),
                transient_retry_delay: Duration::from_millis(
                    polling
                        .transient_retry_delay_ms
                        .unwrap_or(DEFAULT_TRANSIENT_RETRY_DELAY_MS),
                ),
                deadline: polling.deadline_secs.map(Duration::from_secs),
            },
            top_n: report.top_n.unwrap_or(DEFAULT_TOP_N),
            logging: LoggingConfig {
                log_dir: logging.log_dir,
                level_filter: logging
                    .level_filter
                    .unwrap_or_else(|| DEFAULT_LEVEL_FILTER.to_string()),
                rotation,
                file_json_format: logging.file_json_format.unwrap_or(true),
            },
            log_cleanup_days: logging.cleanup_days.unwrap_or(DEFAULT_LOG_CLEANUP_DAYS),
        })
    }
}
