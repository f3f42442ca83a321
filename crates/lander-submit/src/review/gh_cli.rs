//! GitHub pull requests through the `gh` command line tool.
//!
//! Uses whatever account `gh auth login` set up; no token in config.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lander_core::{LanderError, Result};
use serde::Deserialize;
use tokio::process::Command;

use super::{ReviewHandle, ReviewProvider, ReviewRequest, ReviewState};

pub struct GhCliProvider {
    work_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrView {
    state: String,
    #[serde(default)]
    merge_commit: Option<MergeCommit>,
}

#[derive(Debug, Deserialize)]
struct MergeCommit {
    oid: String,
}

impl GhCliProvider {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
        }
    }

    async fn gh(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("gh")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .await
            .map_err(|e| {
                LanderError::Review(format!(
                    "gh CLI not available ({}); install GitHub CLI to create PRs",
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LanderError::Review(format!(
                "gh {} failed: {}",
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// PR number from a URL like https://github.com/owner/repo/pull/123.
fn pr_number_from_url(url: &str) -> Option<u64> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

fn view_to_state(view: PrView) -> ReviewState {
    match view.state.as_str() {
        "MERGED" => ReviewState::Merged {
            merge_commit: view.merge_commit.map(|c| c.oid),
        },
        "CLOSED" => ReviewState::Closed,
        _ => ReviewState::Open,
    }
}

#[async_trait]
impl ReviewProvider for GhCliProvider {
    fn name(&self) -> &str {
        "github-cli"
    }

    async fn create_review(&self, request: &ReviewRequest) -> Result<ReviewHandle> {
        let mut args: Vec<&str> = vec![
            "pr",
            "create",
            "--base",
            &request.base_branch,
            "--head",
            &request.branch,
            "--title",
            &request.title,
            "--body",
            &request.description,
        ];
        if request.draft {
            args.push("--draft");
        }
        for reviewer in &request.reviewers {
            args.push("--reviewer");
            args.push(reviewer);
        }
        for label in &request.labels {
            args.push("--label");
            args.push(label);
        }

        let url = self.gh(&args).await?;
        let id = pr_number_from_url(&url).ok_or_else(|| {
            LanderError::Review(format!("could not read PR number from gh output: {}", url))
        })?;
        Ok(ReviewHandle { id, url })
    }

    async fn close_review(&self, id: u64, reason: &str) -> Result<()> {
        let number = id.to_string();
        self.gh(&["pr", "close", &number, "--comment", reason])
            .await?;
        Ok(())
    }

    async fn review_state(&self, id: u64) -> Result<ReviewState> {
        let number = id.to_string();
        let out = self
            .gh(&["pr", "view", &number, "--json", "state,mergeCommit"])
            .await?;
        let view: PrView = serde_json::from_str(&out)
            .map_err(|e| LanderError::Review(format!("unreadable gh pr view output: {}", e)))?;
        Ok(view_to_state(view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pr_number() {
        assert_eq!(
            pr_number_from_url("https://github.com/acme/app/pull/123"),
            Some(123)
        );
        assert_eq!(
            pr_number_from_url("https://github.com/acme/app/pull/9/"),
            Some(9)
        );
        assert_eq!(pr_number_from_url("not a url"), None);
    }

    #[test]
    fn view_states() {
        let merged: PrView =
            serde_json::from_str(r#"{"state":"MERGED","mergeCommit":{"oid":"abc123"}}"#).unwrap();
        assert_eq!(
            view_to_state(merged),
            ReviewState::Merged {
                merge_commit: Some("abc123".to_string())
            }
        );
        let closed: PrView =
            serde_json::from_str(r#"{"state":"CLOSED","mergeCommit":null}"#).unwrap();
        assert_eq!(view_to_state(closed), ReviewState::Closed);
        let open: PrView = serde_json::from_str(r#"{"state":"OPEN"}"#).unwrap();
        assert_eq!(view_to_state(open), ReviewState::Open);
    }

    #[tokio::test]
    async fn missing_binary_is_review_error() {
        let provider = GhCliProvider::new(Path::new("/nonexistent-lander-dir"));
        let err = provider.review_state(1).await.unwrap_err();
        assert!(matches!(err, LanderError::Review(_)));
    }
}
