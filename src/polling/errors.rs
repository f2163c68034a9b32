use std::time::Duration;
use thiserror::Error;

use crate::api::ApiError;
use crate::polling::poller::VersionRole;

#[derive(Error, Debug)]
pub enum PollError {
    #[error("{role} version '{version}' is not available: {source}")]
    VersionDoesNotExist {
        role: VersionRole,
        version: String,
        source: ApiError,
    },
    #[error("Status lookup failed: {0}")]
    Api(#[from] ApiError),
    #[error("Processing of {role} version '{version}' failed: {message}")]
    ProcessingFailed {
        role: VersionRole,
        version: String,
        message: String,
    },
    #[error("Timed out after {waited:?} waiting for {role} version '{version}'")]
    TimedOut {
        role: VersionRole,
        version: String,
        waited: Duration,
    },
}
