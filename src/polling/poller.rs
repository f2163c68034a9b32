use serde::Serialize;
use std::fmt;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::api::{ApiError, RemoteStatusClient, StatusDetails, StatusReport, VersionStatus};
use crate::polling::backoff::{sample_jitter, BackoffSchedule, PollConfig};
use crate::polling::errors::PollError;

/// Which side of a comparison is being awaited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VersionRole {
    Base,
    Target,
}

impl fmt::Display for VersionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRole::Base => write!(f, "base"),
            VersionRole::Target => write!(f, "target"),
        }
    }
}

/// Terminal answer of a poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollOutcome {
    pub status: VersionStatus,
    pub message: Option<String>,
    pub details: Option<StatusDetails>,
    /// Status queries issued, transient retries included
    pub queries: u32,
}

impl PollOutcome {
    fn from_report(report: StatusReport, queries: u32) -> Self {
        let details = StatusDetails::for_status(report.status, report.url.as_deref(), false);
        Self {
            status: report.status,
            message: report.message,
            details,
            queries,
        }
    }

    /// Treat anything but `Ready` as a processing failure
    pub fn require_ready(self, role: VersionRole, version: &str) -> Result<Self, PollError> {
        match self.status {
            VersionStatus::Ready => Ok(self),
            VersionStatus::Failed => Err(PollError::ProcessingFailed {
                role,
                version: version.to_string(),
                message: self.message.unwrap_or_else(|| "Unknown error".to_string()),
            }),
            VersionStatus::Pending => Err(PollError::ProcessingFailed {
                role,
                version: version.to_string(),
                message: "still in progress".to_string(),
            }),
        }
    }
}

/// Waits for a version to leave the `Pending` state.
///
/// Between queries it sleeps a uniformly random duration below an exponentially
/// growing, capped ceiling so that concurrent pollers do not synchronize.
pub struct StatusPoller<'a, C: RemoteStatusClient + ?Sized> {
    client: &'a C,
    config: PollConfig,
}

impl<'a, C: RemoteStatusClient + ?Sized> StatusPoller<'a, C> {
    pub fn new(client: &'a C, config: PollConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll until the version is `Ready` or `Failed`.
    ///
    /// A `Failed` status is returned as a normal outcome; callers that need a
    /// ready version use [`PollOutcome::require_ready`]. With a configured deadline
    /// the wait ends in [`PollError::TimedOut`].
    pub async fn await_ready(
        &self,
        project: &str,
        version: &str,
        role: VersionRole,
        allow_transient_retry: bool,
    ) -> Result<PollOutcome, PollError> {
        let started = Instant::now();
        let polling = self.poll_until_terminal(project, version, role, allow_transient_retry);

        match self.config.deadline {
            Some(deadline) => timeout(deadline, polling).await.map_err(|_| PollError::TimedOut {
                role,
                version: version.to_string(),
                waited: started.elapsed(),
            })?,
            None => polling.await,
        }
    }

    async fn poll_until_terminal(
        &self,
        project: &str,
        version: &str,
        role: VersionRole,
        allow_transient_retry: bool,
    ) -> Result<PollOutcome, PollError> {
        let mut schedule = BackoffSchedule::new(&self.config);
        let mut announced = false;
        let mut queries = 0u32;

        loop {
            let report = self
                .query(project, version, role, allow_transient_retry, &mut queries)
                .await?;

            if report.status.is_terminal() {
                debug!(%role, version, status = %report.status, queries, "Version reached terminal status");
                return Ok(PollOutcome::from_report(report, queries));
            }

            if !announced {
                announced = true;
                info!(
                    %role,
                    version,
                    "⏳ Waiting for {} version processing to finish. This may take a moment...",
                    role
                );
            }

            let ceiling = schedule.advance();
            let delay = {
                let mut rng = rand::thread_rng();
                sample_jitter(ceiling, &mut rng)
            };
            debug!(%role, version, ?ceiling, ?delay, "Version still pending");
            sleep(delay).await;
        }
    }

    /// Single status lookup with at most one delayed retry for a transient failure
    async fn query(
        &self,
        project: &str,
        version: &str,
        role: VersionRole,
        allow_transient_retry: bool,
        queries: &mut u32,
    ) -> Result<StatusReport, PollError> {
        *queries += 1;
        let first = match self.client.fetch_status(project, version).await {
            Ok(report) => return Ok(report),
            Err(e) => e,
        };

        if !first.is_transient() {
            return Err(PollError::Api(first));
        }
        if !allow_transient_retry {
            return Err(not_found(role, version, first));
        }

        warn!(
            %role,
            version,
            error = %first,
            retry_in = ?self.config.transient_retry_delay,
            "Version lookup failed, retrying once"
        );
        sleep(self.config.transient_retry_delay).await;

        *queries += 1;
        self.client.fetch_status(project, version).await.map_err(|e| {
            if e.is_transient() {
                not_found(role, version, e)
            } else {
                PollError::Api(e)
            }
        })
    }
}

fn not_found(role: VersionRole, version: &str, source: ApiError) -> PollError {
    PollError::VersionDoesNotExist {
        role,
        version: version.to_string(),
        source,
    }
}

/// One status lookup together with its dashboard link details.
///
/// With `allow_in_progress` the details use the progress wording and are present
/// even for a pending version; otherwise a pending version has no details.
pub async fn status_with_details<C: RemoteStatusClient + ?Sized>(
    client: &C,
    project: &str,
    version: &str,
    allow_in_progress: bool,
) -> Result<(StatusReport, Option<StatusDetails>), ApiError> {
    let report = client.fetch_status(project, version).await?;
    let details = StatusDetails::for_status(report.status, report.url.as_deref(), allow_in_progress);
    Ok((report, details))
}
