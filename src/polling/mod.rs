//! Version readiness polling
//!
//! Waits for asynchronous backend processing of an uploaded version using
//! exponential backoff with full jitter, a single delayed retry for transient
//! lookup failures and an optional overall deadline.

pub mod backoff;
pub mod errors;
pub mod poller;

pub use backoff::*;
pub use errors::*;
pub use poller::*;
