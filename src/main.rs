use chrono::Utc;
use clap::{Parser, Subcommand};
use loci_ci::api::{InsightsSource, LociCliClient, RemoteStatusClient, UploadRequest, VersionStatus};
use loci_ci::config::LociConfig;
use loci_ci::insights::aggregate_batch;
use loci_ci::logging::{cleanup_old_logs, init_logging};
use loci_ci::outputs::StepOutputs;
use loci_ci::polling::{status_with_details, StatusPoller, VersionRole};
use loci_ci::report::{render_upload_summary, RunSummary, MISSING_DIFF_WARNING};
use loci_ci::versions::{resolve_versions, TriggerContext};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// CI steps for LOCI binary analysis
#[derive(Debug, Parser)]
#[command(name = "loci-ci")]
#[command(about = "Resolve, upload and summarize LOCI analysis versions in CI")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "LOCI_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve target and base version names and check the base version
    Resolve {
        #[arg(long, env = "LOCI_PROJECT")]
        project: String,

        /// Explicit base version; overrides the pull request merge base
        #[arg(long)]
        base: Option<String>,

        /// Explicit target version; overrides the detected head
        #[arg(long)]
        target: Option<String>,

        /// Wait for a pending base version instead of failing
        #[arg(long)]
        wait_base: bool,
    },

    /// Upload an archive of binaries as a new project version
    Upload {
        #[arg(long, env = "LOCI_PROJECT")]
        project: String,

        #[arg(long, env = "LOCI_TARGET")]
        target: String,

        #[arg(long, value_name = "FILE")]
        archive: PathBuf,

        #[arg(long, env = "LOCI_BASE")]
        base: Option<String>,
    },

    /// Query the processing status of a version once
    Status {
        #[arg(long, env = "LOCI_PROJECT")]
        project: String,

        #[arg(long)]
        version: String,
    },

    /// Wait for the target version and write the run summary
    Summary {
        #[arg(long, env = "LOCI_PROJECT")]
        project: String,

        #[arg(long, env = "LOCI_TARGET")]
        target: String,

        #[arg(long, env = "LOCI_BASE")]
        base: Option<String>,

        /// Number of symbols shown in the table
        #[arg(long)]
        top_n: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match LociConfig::from_toml(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => LociConfig::default(),
    };
    if cli.verbose {
        config.logging = config.logging.verbose();
    }

    let _logging_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("❌ Failed to initialize logging system: {}", e);
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(config.logging.level_filter.as_str())
                .try_init()
                .ok();
            error!("⚠️ Using fallback console-only logging due to error: {}", e);
            None
        }
    };

    if let Some(log_dir) = &config.logging.log_dir {
        if let Err(e) = cleanup_old_logs(log_dir, config.log_cleanup_days) {
            warn!("⚠️ Failed to clean up old log files: {}", e);
        }
    }

    let outputs = StepOutputs::from_vars(|name| std::env::var(name).ok());

    let (step, result) = match cli.command {
        Commands::Resolve {
            project,
            base,
            target,
            wait_base,
        } => (
            "Resolving versions failed",
            run_resolve(&config, &outputs, &project, base.as_deref(), target.as_deref(), wait_base).await,
        ),
        Commands::Upload {
            project,
            target,
            archive,
            base,
        } => (
            "Upload failed",
            run_upload(&config, &outputs, &project, &target, archive, non_empty(base.as_deref())).await,
        ),
        Commands::Status { project, version } => (
            "Status check failed",
            run_status(&config, &outputs, &project, &version).await,
        ),
        Commands::Summary {
            project,
            target,
            base,
            top_n,
        } => (
            "Insights failed",
            run_summary(
                &config,
                &outputs,
                &project,
                &target,
                non_empty(base.as_deref()),
                top_n.unwrap_or(config.top_n),
            )
            .await,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {}: {}", step, e);
            ExitCode::FAILURE
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn client(config: &LociConfig) -> Result<LociCliClient, BoxError> {
    Ok(LociCliClient::new(config.api.binary.clone(), config.api.work_dir.clone())?)
}

/// Capture the CI environment and event payload once
fn load_trigger_context() -> Result<TriggerContext, BoxError> {
    let payload = match std::env::var("GITHUB_EVENT_PATH") {
        Ok(path) if !path.is_empty() => match std::fs::read_to_string(&path) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(path = %path, "⚠️ Failed to read event payload: {}", e);
                None
            }
        },
        _ => None,
    };

    Ok(TriggerContext::from_vars(|name| std::env::var(name).ok(), payload.as_deref())?)
}

async fn run_resolve(
    config: &LociConfig,
    outputs: &StepOutputs,
    project: &str,
    base: Option<&str>,
    target: Option<&str>,
    wait_base: bool,
) -> Result<(), BoxError> {
    let ctx = load_trigger_context()?;

    if let Some(base) = non_empty(base) {
        info!("Provided base version: {}. It takes priority over the detected merge base.", base);
    }
    if let Some(target) = non_empty(target) {
        info!("Provided target version: {}. It takes priority over the detected head.", target);
    }

    let resolved = resolve_versions(&ctx, base, target, Utc::now());

    info!(event = %ctx.event_name, "🔧 Trigger context");
    match &ctx.pull_request {
        Some(pr) => info!(base_branch = %pr.base_ref, head_branch = %pr.head_ref, "Pull request"),
        None => info!(commit = %ctx.sha, "Commit"),
    }
    info!(actor = %ctx.actor, automated = ctx.is_automated_actor(), "Actor");

    match &resolved.base {
        Some(base) => {
            info!(base = %base, target = %resolved.target, "Comparison analysis");
            if let Some(pr) = &ctx.pull_request {
                info!("PullRequest: #{}", pr.number);
            }

            let client = client(config)?;
            let (status, message) = if wait_base {
                let outcome = StatusPoller::new(&client, config.polling.clone())
                    .await_ready(project, base, VersionRole::Base, true)
                    .await?;
                (outcome.status, outcome.message)
            } else {
                let report = client.fetch_status(project, base).await?;
                if report.status == VersionStatus::Pending {
                    return Err("Base version is still being processed. Comparison terminated (waiting disabled).\n\
                                Tip: Re-run with --wait-base to wait for the base version automatically."
                        .into());
                }
                (report.status, report.message)
            };

            if status != VersionStatus::Ready {
                return Err(format!(
                    "Base version failed to process successfully: {}. Comparison aborted.",
                    message.as_deref().unwrap_or("Unknown error")
                )
                .into());
            }
            info!("✅ Base version is ready. Proceeding with comparison.");
        }
        None => info!(target = %resolved.target, "Single analysis"),
    }

    let base = resolved.base.as_deref().unwrap_or_default();
    outputs.set_output("target", &resolved.target)?;
    outputs.set_output("base", base)?;
    outputs.export_variable("LOCI_TARGET", &resolved.target)?;
    outputs.export_variable("LOCI_BASE", base)?;
    Ok(())
}

async fn run_upload(
    config: &LociConfig,
    outputs: &StepOutputs,
    project: &str,
    target: &str,
    archive: PathBuf,
    base: Option<&str>,
) -> Result<(), BoxError> {
    if !archive.is_file() {
        return Err(format!("archive '{}' not found. Terminating analysis.", archive.display()).into());
    }

    info!(project, target, archive = %archive.display(), "Upload version");
    if let Some(base) = base {
        info!(base, "Comparing against base");
        if base == target {
            warn!("Base version equals head ({}), redundant analysis", base);
        }
    }

    let ctx = load_trigger_context()?;
    let request = UploadRequest {
        archive,
        project: project.to_string(),
        target: target.to_string(),
        base: base.map(str::to_string),
        scm_meta: ctx.pull_request.as_ref().map(|pr| pr.scm_meta()),
    };

    let client = client(config)?;
    client.upload(&request).await?;

    let (_, details) = status_with_details(&client, project, target, true).await?;
    if let Some(details) = details {
        outputs.write_summary(&render_upload_summary(&details))?;
    }
    Ok(())
}

async fn run_status(config: &LociConfig, outputs: &StepOutputs, project: &str, version: &str) -> Result<(), BoxError> {
    let client = client(config)?;
    let (report, details) = status_with_details(&client, project, version, false).await?;

    info!(project, version, status = %report.status, message = ?report.message, "Version status");
    if let Some(details) = &details {
        info!("{}", details);
    }
    outputs.set_output("status", &report.status.to_string())?;
    Ok(())
}

async fn run_summary(
    config: &LociConfig,
    outputs: &StepOutputs,
    project: &str,
    target: &str,
    base: Option<&str>,
    top_n: usize,
) -> Result<(), BoxError> {
    let client = client(config)?;

    let outcome = StatusPoller::new(&client, config.polling.clone())
        .await_ready(project, target, VersionRole::Target, false)
        .await?;
    let details = match (outcome.status, outcome.details) {
        (VersionStatus::Ready, Some(details)) => details,
        _ => return Err(format!("Processing of target version '{}' is unavailable.", target).into()),
    };
    info!("✅ Binaries processed successfully.");

    info!(project, head = target, "Fetch function insights");
    if let Some(base) = base {
        info!(base, "Comparing against base");
        if base == target {
            warn!("Base version equals head ({}), analysis may be uninformative.", base);
        }
    }
    let batch = client.fetch_insights(project, target, base).await?;

    let ctx = load_trigger_context()?;
    let agent_summary = match base {
        Some(base) if ctx.is_pull_request() => match &ctx.pull_request {
            Some(pr) => match client.fetch_agent_summary(project, target, base, &pr.scm_meta()).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!("Failed to fetch agent summary: {}", e);
                    None
                }
            },
            None => {
                warn!("AI agent summary is not available outside of a pull request context.");
                None
            }
        },
        _ => None,
    };
    if let Some(summary) = &agent_summary {
        outputs.set_output("loci_summary", &format!("{}\n{}", summary, details.as_markdown()))?;
        info!("AI summary report fetched successfully");
    }

    let report = aggregate_batch(&batch, base.is_some(), top_n);
    let summary = RunSummary::new(&report, &details).with_agent_summary(agent_summary.as_deref());
    if summary.missing_diff_summary() {
        warn!("{}", MISSING_DIFF_WARNING);
    }

    outputs.replace_summary(&summary.render())?;
    info!(rows = report.rows.len(), total = report.total_count, "📝 Run summary written");
    Ok(())
}
