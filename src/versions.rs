//! Trigger context and version naming
//!
//! The CI environment is captured once into a [`TriggerContext`] by the binary
//! and passed in; nothing here reads process state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::common::constants::SHORT_SHA_LEN;

/// Source-control metadata attached to uploads and summaries of a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmMeta {
    pub owner: String,
    pub repo: String,
    pub head_sha: String,
    pub pr_number: String,
}

impl ScmMeta {
    pub fn to_json(&self) -> Result<String, ApiError> {
        serde_json::to_string(self).map_err(|e| ApiError::Parse(format!("Failed to encode SCM metadata: {}", e)))
    }
}

/// Pull request fields taken from the triggering event payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestData {
    pub actor: Option<String>,
    pub actor_type: Option<String>,
    pub base_sha: String,
    pub head_sha: String,
    pub base_ref: String,
    pub head_ref: String,
    pub number: u64,
    pub owner: String,
    pub repo: String,
    pub repo_full_name: String,
}

impl PullRequestData {
    /// Extract pull request data from an event payload; `None` if the event carries no pull request
    pub fn from_event_payload(payload: &str) -> Result<Option<Self>, serde_json::Error> {
        let event: EventPayload = serde_json::from_str(payload)?;
        let Some(pr) = event.pull_request else {
            return Ok(None);
        };

        let repository = event.repository.unwrap_or_default();
        let sender = event.sender.unwrap_or_default();

        Ok(Some(Self {
            actor: sender.login,
            actor_type: sender.kind,
            base_sha: pr.base.sha.unwrap_or_default(),
            head_sha: pr.head.sha.unwrap_or_default(),
            base_ref: pr.base.r#ref.unwrap_or_default(),
            head_ref: pr.head.r#ref.unwrap_or_default(),
            number: pr.number,
            owner: repository.owner.and_then(|o| o.login).unwrap_or_default(),
            repo: repository.name.unwrap_or_default(),
            repo_full_name: repository.full_name.unwrap_or_default(),
        }))
    }

    pub fn scm_meta(&self) -> ScmMeta {
        ScmMeta {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            head_sha: self.head_sha.clone(),
            pr_number: self.number.to_string(),
        }
    }

    pub fn base_version(&self) -> String {
        format!("{}@{}", self.base_ref, short_sha(&self.base_sha))
    }

    pub fn head_version(&self) -> String {
        format!("{}@{}", self.head_ref, short_sha(&self.head_sha))
    }
}

#[derive(Debug, Default, Deserialize)]
struct EventPayload {
    #[serde(default)]
    pull_request: Option<RawPullRequest>,
    #[serde(default)]
    sender: Option<RawSender>,
    #[serde(default)]
    repository: Option<RawRepository>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    #[serde(default)]
    number: u64,
    #[serde(default)]
    base: RawBranch,
    #[serde(default)]
    head: RawBranch,
}

#[derive(Debug, Default, Deserialize)]
struct RawBranch {
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    r#ref: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSender {
    #[serde(default)]
    login: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRepository {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    owner: Option<RawOwner>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOwner {
    #[serde(default)]
    login: Option<String>,
}

/// What triggered the current CI run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerContext {
    pub event_name: String,
    pub sha: String,
    pub ref_name: String,
    pub actor: String,
    pub pull_request: Option<PullRequestData>,
}

impl TriggerContext {
    /// Build from CI variables (`GITHUB_EVENT_NAME`, `GITHUB_SHA`, `GITHUB_REF_NAME`,
    /// `GITHUB_ACTOR`) and the raw event payload. Pull request data is only kept for
    /// `pull_request` events.
    pub fn from_vars<F>(lookup: F, event_payload: Option<&str>) -> Result<Self, serde_json::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).unwrap_or_default();
        let event_name = var("GITHUB_EVENT_NAME");

        let pull_request = match event_payload {
            Some(payload) if event_name == "pull_request" => PullRequestData::from_event_payload(payload)?,
            _ => None,
        };

        Ok(Self {
            event_name,
            sha: var("GITHUB_SHA"),
            ref_name: var("GITHUB_REF_NAME"),
            actor: var("GITHUB_ACTOR"),
            pull_request,
        })
    }

    pub fn is_pull_request(&self) -> bool {
        self.event_name == "pull_request"
    }

    /// Bot accounts and apps
    pub fn is_automated_actor(&self) -> bool {
        let sender_type = self
            .pull_request
            .as_ref()
            .and_then(|pr| pr.actor_type.as_deref());
        self.actor.ends_with("[bot]") || matches!(sender_type, Some("Bot") | Some("App"))
    }
}

/// Target and optional base version names for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVersions {
    pub target: String,
    pub base: Option<String>,
}

impl ResolvedVersions {
    pub fn is_comparison(&self) -> bool {
        self.base.is_some()
    }
}

/// Pick version names: explicit inputs first, then the pull request's base and head,
/// then `<ref>@<sha>` of the triggering commit. Outside a pull request there is no
/// base unless one is given.
pub fn resolve_versions(
    ctx: &TriggerContext,
    provided_base: Option<&str>,
    provided_target: Option<&str>,
    now: DateTime<Utc>,
) -> ResolvedVersions {
    let provided_base = non_empty(provided_base);
    let provided_target = non_empty(provided_target);

    if let Some(pr) = &ctx.pull_request {
        return ResolvedVersions {
            target: provided_target.unwrap_or_else(|| pr.head_version()),
            base: Some(provided_base.unwrap_or_else(|| pr.base_version())),
        };
    }

    let target = provided_target.unwrap_or_else(|| {
        if ctx.ref_name.is_empty() && ctx.sha.is_empty() {
            now.format("%Y-%m-%dT%H-%M-%S").to_string()
        } else {
            format!("{}@{}", ctx.ref_name, short_sha(&ctx.sha))
        }
    });

    ResolvedVersions {
        target,
        base: provided_base,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn short_sha(sha: &str) -> &str {
    match sha.char_indices().nth(SHORT_SHA_LEN) {
        Some((idx, _)) => &sha[..idx],
        None => sha,
    }
}
