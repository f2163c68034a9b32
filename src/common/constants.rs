/// Remote command and payload constants
pub const DEFAULT_API_BINARY: &str = "loci_api";
// Prefixes of the JSON answer files written by the remote command
pub const STATUS_OUTPUT_PREFIX: &str = "status";
pub const INSIGHTS_OUTPUT_PREFIX: &str = "insights";
pub const SUMMARY_OUTPUT_PREFIX: &str = "summary";

// Wire status codes
pub const STATUS_CODE_PENDING: i64 = -1;
pub const STATUS_CODE_READY: i64 = 0;

// Polling defaults (milliseconds)
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 30_000;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.7;
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;
pub const DEFAULT_TRANSIENT_RETRY_DELAY_MS: u64 = 10_000;

// Report defaults
pub const DEFAULT_TOP_N: usize = 10;
pub const UNKNOWN_BINARY: &str = "__unknown__";
pub const SHORT_SHA_LEN: usize = 7;

// Dashboard link presentation
pub const DASHBOARD_LABEL: &str = "LOCI Dashboard";
pub const MSG_IN_PROGRESS: &str = "🟄 Check the current upload progress status and any updates in";
pub const MSG_READY: &str = "🟄 Explore the in-depth analysis in";
pub const MSG_FAILED: &str = "× Analysis unavailable at the moment. Check for more info in";

// Logging
pub const DEFAULT_LEVEL_FILTER: &str = "info,loci_ci=info";
pub const LOG_FILE_PREFIX: &str = "loci_ci";
pub const DEFAULT_LOG_CLEANUP_DAYS: u32 = 30;
