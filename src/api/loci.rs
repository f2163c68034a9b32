use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tempfile::{NamedTempFile, TempDir};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::api::client::{InsightsSource, RemoteStatusClient};
use crate::api::types::{ApiError, StatusReport};
use crate::common::constants::{INSIGHTS_OUTPUT_PREFIX, STATUS_OUTPUT_PREFIX, SUMMARY_OUTPUT_PREFIX};
use crate::insights::InsightsBatch;
use crate::versions::ScmMeta;

/// Upload of a packaged archive as a new project version
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub archive: PathBuf,
    pub project: String,
    pub target: String,
    pub base: Option<String>,
    pub scm_meta: Option<ScmMeta>,
}

/// Client backed by the `loci_api` command line tool.
///
/// Every call writes its JSON answer to a fresh file inside `work_dir`, which is
/// read back and parsed once the command exits.
pub struct LociCliClient {
    binary: String,
    work_dir: PathBuf,
    _scratch: Option<TempDir>,
}

impl LociCliClient {
    /// Create a client. Without a `work_dir` a scratch directory is created and
    /// removed when the client is dropped.
    pub fn new(binary: impl Into<String>, work_dir: Option<PathBuf>) -> Result<Self, ApiError> {
        let (work_dir, scratch) = match work_dir {
            Some(dir) => {
                std::fs::create_dir_all(&dir)?;
                (dir, None)
            }
            None => {
                let scratch = TempDir::new()?;
                (scratch.path().to_path_buf(), Some(scratch))
            }
        };

        Ok(Self {
            binary: binary.into(),
            work_dir,
            _scratch: scratch,
        })
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Upload a version without waiting for processing
    pub async fn upload(&self, request: &UploadRequest) -> Result<(), ApiError> {
        let args = Self::upload_args(request)?;
        let output = self.run(&args, false).await?;
        if !output.status.success() {
            return Err(ApiError::CommandFailed(describe_failure(&output)));
        }
        info!(project = %request.project, target = %request.target, "📦 Project version uploaded");
        Ok(())
    }

    /// Fetch the generated change summary for a compared pull request.
    ///
    /// Returns `None` when the backend has no summary for this pair of versions.
    pub async fn fetch_agent_summary(
        &self,
        project: &str,
        target: &str,
        base: &str,
        scm_meta: &ScmMeta,
    ) -> Result<Option<String>, ApiError> {
        let output_file = self.output_file(SUMMARY_OUTPUT_PREFIX)?;
        let args = Self::summary_args(project, target, base, scm_meta, output_file.path())?;

        let output = self.run(&args, false).await?;
        if !output.status.success() {
            return Err(ApiError::CommandFailed(describe_failure(&output)));
        }

        let body = tokio::fs::read_to_string(output_file.path()).await?;
        let summary: Option<String> = serde_json::from_str(&body)
            .map_err(|e| ApiError::Parse(format!("Failed to parse agent summary: {}", e)))?;

        match summary {
            Some(raw) => Ok(format_agent_summary(&raw)),
            None => {
                warn!("No summary found");
                Ok(None)
            }
        }
    }

    /// Run the tool, relaying its stdout and stderr to the log line by line as
    /// they arrive. Both streams are also kept in the returned `Output`.
    async fn run(&self, args: &[String], silent: bool) -> Result<Output, ApiError> {
        debug!(binary = %self.binary, ?args, "Invoking remote command");

        let io_error = |e: std::io::Error| ApiError::Io(format!("Failed to run '{}': {}", self.binary, e));

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(io_error)?;

        let (stdout, stderr) = tokio::try_join!(
            relay_lines(child.stdout.take(), StreamKind::Stdout, silent),
            relay_lines(child.stderr.take(), StreamKind::Stderr, silent),
        )
        .map_err(io_error)?;
        let status = child.wait().await.map_err(io_error)?;

        Ok(Output { status, stdout, stderr })
    }

    fn output_file(&self, prefix: &str) -> Result<NamedTempFile, ApiError> {
        tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".json")
            .tempfile_in(&self.work_dir)
            .map_err(ApiError::from)
    }

    fn status_args(project: &str, version: &str, output: &Path) -> Vec<String> {
        vec![
            "status".to_string(),
            project.to_string(),
            version.to_string(),
            "--output".to_string(),
            output.display().to_string(),
        ]
    }

    fn insights_args(project: &str, target: &str, base: Option<&str>, output: &Path) -> Vec<String> {
        let mut args = vec![
            "func-insights".to_string(),
            project.to_string(),
            target.to_string(),
            "--output".to_string(),
            output.display().to_string(),
        ];

        if let Some(base) = base {
            args.extend([
                "--version-name-base".to_string(),
                base.to_string(),
                "--filter".to_string(),
                "mod".to_string(),
            ]);
        }

        args
    }

    fn upload_args(request: &UploadRequest) -> Result<Vec<String>, ApiError> {
        let mut args = vec![
            "upload".to_string(),
            request.archive.display().to_string(),
            request.project.clone(),
            request.target.clone(),
            "--no-wait".to_string(),
        ];

        if let Some(base) = &request.base {
            args.extend(["--compare-version-name".to_string(), base.clone()]);
        }

        if let Some(meta) = &request.scm_meta {
            args.extend(["--scm-meta".to_string(), meta.to_json()?]);
        }

        Ok(args)
    }

    fn summary_args(
        project: &str,
        target: &str,
        base: &str,
        scm_meta: &ScmMeta,
        output: &Path,
    ) -> Result<Vec<String>, ApiError> {
        Ok(vec![
            "summary".to_string(),
            project.to_string(),
            target.to_string(),
            base.to_string(),
            "--scm-meta".to_string(),
            scm_meta.to_json()?,
            "--output".to_string(),
            output.display().to_string(),
        ])
    }
}

#[async_trait]
impl RemoteStatusClient for LociCliClient {
    async fn fetch_status(&self, project: &str, version: &str) -> Result<StatusReport, ApiError> {
        let output_file = self.output_file(STATUS_OUTPUT_PREFIX)?;
        let args = Self::status_args(project, version, output_file.path());

        let output = self.run(&args, true).await?;
        if !output.status.success() {
            return Err(ApiError::VersionNotFound {
                version: version.to_string(),
                reason: describe_failure(&output),
            });
        }

        let body = tokio::fs::read_to_string(output_file.path()).await?;
        StatusReport::from_json(&body)
    }
}

#[async_trait]
impl InsightsSource for LociCliClient {
    async fn fetch_insights(
        &self,
        project: &str,
        target: &str,
        base: Option<&str>,
    ) -> Result<InsightsBatch, ApiError> {
        let output_file = self.output_file(INSIGHTS_OUTPUT_PREFIX)?;
        let args = Self::insights_args(project, target, base, output_file.path());

        let output = self.run(&args, false).await?;
        if !output.status.success() {
            return Err(ApiError::CommandFailed(describe_failure(&output)));
        }

        let body = tokio::fs::read_to_string(output_file.path()).await?;
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ApiError::Parse(format!("Failed to parse insights: {}", e)))?;

        let batch = InsightsBatch::from_value(value)?;
        info!(records = batch.insights.len(), "✅ Insights fetched successfully");
        Ok(batch)
    }
}

/// Turn a raw markdown summary into the run-summary form: the first line
/// becomes an italic title with heading markers removed.
pub fn format_agent_summary(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut lines = trimmed.split('\n');
    let title = lines.next().unwrap_or_default().replace('#', "");
    let body: Vec<&str> = lines.collect();

    Some(format!("\n_{}_\n{}", title.trim(), body.join("\n")))
}

fn describe_failure(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        output.status.to_string()
    } else {
        format!("{}: {}", output.status, stderr)
    }
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

/// Log each non-blank line of a child pipe and collect the raw bytes.
/// Stderr goes to `warn!`, stdout to `info!`; both drop to `debug!` when silent.
async fn relay_lines<R>(pipe: Option<R>, kind: StreamKind, silent: bool) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut collected = Vec::new();
    let Some(pipe) = pipe else {
        return Ok(collected);
    };

    let mut segments = BufReader::new(pipe).split(b'\n');
    while let Some(segment) = segments.next_segment().await? {
        let line = String::from_utf8_lossy(&segment);
        let line = line.trim_end_matches('\r');
        if !line.trim().is_empty() {
            match (kind, silent) {
                (_, true) => debug!("{}", line),
                (StreamKind::Stdout, false) => info!("{}", line),
                (StreamKind::Stderr, false) => warn!("{}", line),
            }
        }
        collected.extend_from_slice(&segment);
        collected.push(b'\n');
    }

    Ok(collected)
}
