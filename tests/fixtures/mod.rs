#![allow(dead_code)]

use async_trait::async_trait;
use loci_ci::api::{ApiError, RemoteStatusClient, StatusReport, VersionStatus};
use loci_ci::insights::{DiffSummary, InsightRecord, InsightsBatch};
use loci_ci::polling::PollConfig;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Create a single-version record with the given response mean in nanoseconds
pub fn create_single_record(binary: &str, function: &str, response_ns: f64) -> InsightRecord {
    InsightRecord::new(binary, function).with_means(response_ns, 1_500.0, 250.0)
}

/// Create a compared record whose response changed by `perc_response` percent
pub fn create_compared_record(binary: &str, function: &str, perc_response: f64) -> InsightRecord {
    let base = 10_000.0;
    let target = base * (1.0 + perc_response / 100.0);
    InsightRecord::new(binary, function)
        .with_means(target, 2_000.0, 300.0)
        .with_base_means(base, 2_000.0, 300.0)
        .with_percentages(perc_response, 0.0, 0.0)
}

/// Create a compared batch spread over two binaries
pub fn create_compared_batch(diff_summary: Option<DiffSummary>) -> InsightsBatch {
    let batch = InsightsBatch::new(vec![
        create_compared_record("libcodec.so", "decode_frame", 12.5),
        create_compared_record("server", "handle_request", 40.0),
        create_compared_record("libcodec.so", "encode_frame", -3.0),
        create_compared_record("server", "parse_headers", 40.0),
    ]);
    match diff_summary {
        Some(diff) => batch.with_diff_summary(diff),
        None => batch,
    }
}

/// Raw insights payload as written by `loci_api func-insights`
pub fn create_insights_payload() -> Value {
    json!({
        "insights": [
            {
                "binary_name": "server",
                "function_name": "handle_request",
                "mean_response": "2500000",
                "mean_throughput": 1200.5,
                "mean_bottleneck": 15,
                "mean_response_base": 2000000,
                "mean_throughput_base": 1100,
                "mean_bottleneck_base": 15,
                "perc_response": 25,
                "perc_throughput": 9.14,
                "perc_bottleneck": 0
            },
            {
                "binary_name": "server",
                "function_name": "route",
                "mean_response": 800,
                "mean_throughput": "n/a",
                "mean_bottleneck": 3,
                "perc_response": -12.5
            },
            {
                "function_name": "orphan",
                "mean_response": 10
            }
        ],
        "diff_summary": {"modified": 2, "new": 1, "deleted": 0}
    })
}

/// Poll settings with short delays for paused-clock tests
pub fn create_test_poll_config() -> PollConfig {
    PollConfig {
        initial_delay: Duration::from_millis(100),
        backoff_factor: 1.7,
        max_delay: Duration::from_millis(500),
        transient_retry_delay: Duration::from_millis(50),
        deadline: None,
    }
}

/// Status client answering from a fixed script; the last answer repeats
pub struct ScriptedStatusClient {
    answers: Mutex<VecDeque<Result<StatusReport, ApiError>>>,
    calls: AtomicU32,
}

impl ScriptedStatusClient {
    pub fn new(answers: Vec<Result<StatusReport, ApiError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            calls: AtomicU32::new(0),
        }
    }

    /// `pending` pending answers followed by `terminal`
    pub fn pending_then(pending: usize, terminal: VersionStatus) -> Self {
        let mut answers: Vec<Result<StatusReport, ApiError>> = (0..pending)
            .map(|_| Ok(StatusReport::new(VersionStatus::Pending)))
            .collect();
        answers.push(Ok(StatusReport::new(terminal).with_url("https://dashboard.loci/p/v")));
        Self::new(answers)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStatusClient for ScriptedStatusClient {
    async fn fetch_status(&self, _project: &str, _version: &str) -> Result<StatusReport, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut answers = self.answers.lock().unwrap();
        if answers.len() > 1 {
            answers.pop_front().unwrap()
        } else {
            answers.front().cloned().unwrap()
        }
    }
}
