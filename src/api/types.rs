use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::common::constants::{
    DASHBOARD_LABEL, MSG_FAILED, MSG_IN_PROGRESS, MSG_READY, STATUS_CODE_PENDING, STATUS_CODE_READY,
};
use crate::insights::InsightsError;

/// Processing state of an uploaded version on the analysis backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionStatus {
    /// Processing has not finished yet
    Pending,
    /// Processing succeeded
    Ready,
    /// Processing ran and errored
    Failed,
}

impl VersionStatus {
    /// Map a wire status code. Only `-1` and `0` are meaningful; every other code is a failure.
    pub fn from_code(code: i64) -> Self {
        match code {
            STATUS_CODE_PENDING => VersionStatus::Pending,
            STATUS_CODE_READY => VersionStatus::Ready,
            _ => VersionStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, VersionStatus::Pending)
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionStatus::Pending => write!(f, "pending"),
            VersionStatus::Ready => write!(f, "ready"),
            VersionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One answer from the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: VersionStatus,
    pub message: Option<String>,
    pub url: Option<String>,
}

impl StatusReport {
    pub fn new(status: VersionStatus) -> Self {
        Self {
            status,
            message: None,
            url: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Parse the JSON document written by `loci_api status`.
    ///
    /// A `null` document means the backend has nothing to report and is treated
    /// as a failed version with no dashboard URL.
    pub fn from_json(body: &str) -> Result<Self, ApiError> {
        let payload: Option<RawStatusPayload> = serde_json::from_str(body)
            .map_err(|e| ApiError::Parse(format!("Failed to obtain version status. {}", e)))?;

        let Some(payload) = payload else {
            return Ok(StatusReport::new(VersionStatus::Failed).with_url(""));
        };

        let code = match &payload.status {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            ApiError::Parse(format!(
                "Failed to obtain version status. Unexpected status value: {}",
                payload.status
            ))
        })?;

        Ok(Self {
            status: VersionStatus::from_code(code),
            message: payload.message.filter(|m| !m.is_empty()),
            url: payload.url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawStatusPayload {
    #[serde(default)]
    status: serde_json::Value,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Presentation of a status as a "message + dashboard link" line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDetails {
    pub message: String,
    pub label: String,
    pub url: String,
}

impl StatusDetails {
    /// Build the link details for a status.
    ///
    /// Returns `None` for a pending version unless `allow_in_progress` is set,
    /// in which case the progress wording is used regardless of status.
    pub fn for_status(status: VersionStatus, url: Option<&str>, allow_in_progress: bool) -> Option<Self> {
        if !allow_in_progress && status == VersionStatus::Pending {
            return None;
        }

        let message = if allow_in_progress {
            MSG_IN_PROGRESS
        } else if status == VersionStatus::Ready {
            MSG_READY
        } else {
            MSG_FAILED
        };

        Some(Self {
            message: message.to_string(),
            label: DASHBOARD_LABEL.to_string(),
            url: url.unwrap_or_default().to_string(),
        })
    }

    /// Markdown sentence with an inline link, used for step outputs
    pub fn as_markdown(&self) -> String {
        format!("{} [{}]({}).", self.message, self.label, self.url)
    }
}

impl fmt::Display for StatusDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.message, self.label, self.url)
    }
}

/// Remote API error types
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Version '{version}' does not exist. ({reason})")]
    VersionNotFound { version: String, reason: String },

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Insights error: {0}")]
    Insights(#[from] InsightsError),
}

impl ApiError {
    /// Lookups that may succeed on a later attempt (the version is not yet visible)
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::VersionNotFound { .. } | ApiError::CommandFailed(_))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Io(err.to_string())
    }
}
