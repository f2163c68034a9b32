use async_trait::async_trait;

use crate::api::types::{ApiError, StatusReport};
use crate::insights::InsightsBatch;

/// Status lookup for an uploaded version.
///
/// An `Err` means the backend could not resolve the version at all, which is
/// distinct from a resolved `VersionStatus::Failed`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStatusClient: Send + Sync {
    async fn fetch_status(&self, project: &str, version: &str) -> Result<StatusReport, ApiError>;
}

/// Source of per-function insight records for a target, optionally compared against a base.
///
/// Without a base the returned batch has no diff summary and its records carry no
/// baseline or percentage fields.
#[async_trait]
pub trait InsightsSource: Send + Sync {
    async fn fetch_insights(
        &self,
        project: &str,
        target: &str,
        base: Option<&str>,
    ) -> Result<InsightsBatch, ApiError>;
}
