#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use loci_ci::api::{ApiError, InsightsSource, LociCliClient, RemoteStatusClient, UploadRequest, VersionStatus};
use loci_ci::versions::ScmMeta;
use tempfile::TempDir;

/// Stand-in for `loci_api` that answers from canned JSON and records its arguments
const FAKE_LOCI_API: &str = r###"#!/bin/sh
printf '%s\n' "$*" >> "$(dirname "$0")/calls.log"
cmd="$1"
case "$cmd" in
  status)
    if [ "$3" = "missing@0000000" ]; then
      echo "version not found" >&2
      exit 1
    fi
    printf '%s\n' '{"status": "0", "url": "https://dashboard.loci/engine/'"$3"'"}' > "$5"
    ;;
  func-insights)
    printf '%s\n' '{"insights": [{"binary_name": "server", "function_name": "main", "mean_response": 1500}], "diff_summary": {}}' > "$5"
    ;;
  summary)
    printf '%s\n' '"## Performance review\nNo regressions found."' > "$8"
    ;;
  upload)
    echo "Uploaded $2"
    ;;
  *)
    exit 2
    ;;
esac
"###;

fn install_fake_binary(dir: &Path) -> PathBuf {
    let path = dir.join("loci_api");
    std::fs::write(&path, FAKE_LOCI_API).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

// Single test so that no other test forks while the script is being written.
#[tokio::test]
async fn test_cli_client_against_fake_binary() {
    let bin_dir = TempDir::new().unwrap();
    let work_dir = TempDir::new().unwrap();
    let binary = install_fake_binary(bin_dir.path());
    let client = LociCliClient::new(binary.display().to_string(), Some(work_dir.path().to_path_buf())).unwrap();

    // status
    let report = client.fetch_status("engine", "main@abc1234").await.unwrap();
    assert_eq!(report.status, VersionStatus::Ready);
    assert_eq!(report.url.as_deref(), Some("https://dashboard.loci/engine/main@abc1234"));

    let err = client.fetch_status("engine", "missing@0000000").await.unwrap_err();
    assert!(matches!(err, ApiError::VersionNotFound { .. }));
    assert!(err.to_string().contains("version not found"));

    // insights
    let batch = client.fetch_insights("engine", "main@abc1234", Some("main@0000001")).await.unwrap();
    assert_eq!(batch.insights.len(), 1);
    assert_eq!(batch.insights[0].mean_response, Some(1500.0));
    assert_eq!(batch.diff_summary, None);

    // agent summary
    let meta = ScmMeta {
        owner: "acme".to_string(),
        repo: "engine".to_string(),
        head_sha: "abc1234def".to_string(),
        pr_number: "7".to_string(),
    };
    let summary = client
        .fetch_agent_summary("engine", "feature@abc1234", "main@0000001", &meta)
        .await
        .unwrap();
    assert_eq!(summary.as_deref(), Some("\n_Performance review_\nNo regressions found."));

    // upload
    let archive = bin_dir.path().join("binaries.tar.gz");
    std::fs::write(&archive, b"archive").unwrap();
    client
        .upload(&UploadRequest {
            archive: archive.clone(),
            project: "engine".to_string(),
            target: "feature@abc1234".to_string(),
            base: Some("main@0000001".to_string()),
            scm_meta: None,
        })
        .await
        .unwrap();

    let calls = std::fs::read_to_string(bin_dir.path().join("calls.log")).unwrap();
    let lines: Vec<&str> = calls.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[2].starts_with("func-insights engine main@abc1234 --output "));
    assert!(lines[2].ends_with("--version-name-base main@0000001 --filter mod"));
    assert_eq!(
        lines[4],
        format!(
            "upload {} engine feature@abc1234 --no-wait --compare-version-name main@0000001",
            archive.display()
        )
    );

    // every answer file is removed once read
    assert_eq!(std::fs::read_dir(work_dir.path()).unwrap().count(), 0);
}
