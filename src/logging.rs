//! Logging setup: console output plus optional rotating log files
//!
//! Console logs go to stderr so that stdout stays free for step outputs and
//! rendered summaries.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::common::constants::{DEFAULT_LEVEL_FILTER, LOG_FILE_PREFIX};

/// Logging configuration options
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for rotating log files; console only when `None`
    pub log_dir: Option<String>,
    /// Log level filter (e.g., "info", "debug", "loci_ci=debug")
    pub level_filter: String,
    pub rotation: LogRotation,
    /// Whether to use JSON format for file logs
    pub file_json_format: bool,
}

/// Log rotation configuration
#[derive(Debug, Clone)]
pub enum LogRotation {
    Daily,
    Hourly,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            level_filter: DEFAULT_LEVEL_FILTER.to_string(),
            rotation: LogRotation::Daily,
            file_json_format: true,
        }
    }
}

impl LoggingConfig {
    pub fn verbose(mut self) -> Self {
        self.level_filter = "debug,loci_ci=debug".to_string();
        self
    }
}

/// Initialize console logging and, when a log directory is configured, a rotating file layer.
///
/// `RUST_LOG` overrides the configured filter. The returned guard must be kept
/// alive for the file writer to flush.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level_filter));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_level(true)
        .with_target(false)
        .with_timer(ChronoUtc::new("%H:%M:%S%.3f".to_string()))
        .with_filter(console_filter);

    let mut guard = None;
    let file_layer = match &config.log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let file_filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.level_filter));

            let file_name = format!("{}.log", LOG_FILE_PREFIX);
            let appender = match config.rotation {
                LogRotation::Daily => tracing_appender::rolling::daily(log_dir, file_name),
                LogRotation::Hourly => tracing_appender::rolling::hourly(log_dir, file_name),
            };
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard = Some(file_guard);

            let layer = if config.file_json_format {
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string()))
                    .with_filter(file_filter)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string()))
                    .with_filter(file_filter)
                    .boxed()
            };
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!(
        log_dir = ?config.log_dir,
        rotation = ?config.rotation,
        json_format = config.file_json_format,
        "Logging initialized"
    );

    Ok(guard)
}

/// Remove rotated log files of this tool older than `keep_days`
pub fn cleanup_old_logs(log_dir: &str, keep_days: u32) -> Result<usize, std::io::Error> {
    let cutoff_time = std::time::SystemTime::now()
        - std::time::Duration::from_secs(keep_days as u64 * 24 * 3600);

    let mut removed_count = 0;
    for entry in std::fs::read_dir(log_dir)?.flatten() {
        let path = entry.path();
        let is_ours = path.is_file()
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(LOG_FILE_PREFIX) && name.contains(".log"))
                .unwrap_or(false);
        if !is_ours {
            continue;
        }

        let modified = entry.metadata().and_then(|m| m.modified());
        if let Ok(modified) = modified {
            if modified < cutoff_time && std::fs::remove_file(&path).is_ok() {
                removed_count += 1;
                tracing::debug!("🗑️ Removed old log file: {:?}", path);
            }
        }
    }

    if removed_count > 0 {
        tracing::info!("🧹 Cleaned up {} old log files (older than {} days)", removed_count, keep_days);
    }

    Ok(removed_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.log_dir, None);
        assert_eq!(config.level_filter, "info,loci_ci=info");
        assert!(matches!(config.rotation, LogRotation::Daily));
        assert!(config.file_json_format);

        assert_eq!(config.verbose().level_filter, "debug,loci_ci=debug");
    }

    #[test]
    fn test_cleanup_keeps_recent_and_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();

        std::fs::write(log_dir.join("loci_ci.log.2025-01-01"), "recent").unwrap();
        std::fs::write(log_dir.join("other.log"), "foreign").unwrap();

        let removed = cleanup_old_logs(log_dir.to_str().unwrap(), 7).unwrap();
        assert_eq!(removed, 0);
        assert!(log_dir.join("loci_ci.log.2025-01-01").exists());
        assert!(log_dir.join("other.log").exists());
    }

    #[test]
    fn test_cleanup_with_zero_retention() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();
        std::fs::write(log_dir.join("loci_ci.log.2025-01-01"), "old").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        let removed = cleanup_old_logs(log_dir.to_str().unwrap(), 0).unwrap();
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_cleanup_missing_dir() {
        assert!(cleanup_old_logs("/nonexistent/loci-logs", 7).is_err());
    }
}
