//! GitHub pull requests over the REST API.

use async_trait::async_trait;
use lander_core::Result;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{http_client, send_json, ReviewHandle, ReviewProvider, ReviewRequest, ReviewState};

pub struct GithubProvider {
    client: reqwest::Client,
    api_url: String,
    owner: String,
    repo: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    merge_commit_sha: Option<String>,
}

impl GithubProvider {
    pub fn new(api_url: &str, owner: &str, repo: &str, token: String) -> Self {
        Self {
            client: http_client(),
            api_url: api_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token,
        }
    }

    fn url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url, self.owner, self.repo, tail
        )
    }

    fn request(&self, method: reqwest::Method, tail: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(tail))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

#[async_trait]
impl ReviewProvider for GithubProvider {
    fn name(&self) -> &str {
        "github"
    }

    async fn create_review(&self, request: &ReviewRequest) -> Result<ReviewHandle> {
        let pull: PullResponse = send_json(
            self.request(reqwest::Method::POST, "pulls").json(&json!({
                "title": request.title,
                "head": request.branch,
                "base": request.base_branch,
                "body": request.description,
                "draft": request.draft,
            })),
            "create pull request",
        )
        .await?;

        // Reviewers and labels are extras; the pull request already exists.
        if !request.reviewers.is_empty() {
            let tail = format!("pulls/{}/requested_reviewers", pull.number);
            if let Err(e) = send_json::<Value>(
                self.request(reqwest::Method::POST, &tail)
                    .json(&json!({ "reviewers": request.reviewers })),
                "request reviewers",
            )
            .await
            {
                tracing::warn!("PR #{}: {}", pull.number, e);
            }
        }
        if !request.labels.is_empty() {
            let tail = format!("issues/{}/labels", pull.number);
            if let Err(e) = send_json::<Value>(
                self.request(reqwest::Method::POST, &tail)
                    .json(&json!({ "labels": request.labels })),
                "add labels",
            )
            .await
            {
                tracing::warn!("PR #{}: {}", pull.number, e);
            }
        }

        tracing::info!("created PR #{}: {}", pull.number, pull.html_url);
        Ok(ReviewHandle {
            id: pull.number,
            url: pull.html_url,
        })
    }

    async fn close_review(&self, id: u64, reason: &str) -> Result<()> {
        send_json::<Value>(
            self.request(reqwest::Method::POST, &format!("issues/{}/comments", id))
                .json(&json!({ "body": reason })),
            "comment on pull request",
        )
        .await?;
        send_json::<Value>(
            self.request(reqwest::Method::PATCH, &format!("pulls/{}", id))
                .json(&json!({ "state": "closed" })),
            "close pull request",
        )
        .await?;
        Ok(())
    }

    async fn review_state(&self, id: u64) -> Result<ReviewState> {
        let pull: PullResponse = send_json(
            self.request(reqwest::Method::GET, &format!("pulls/{}", id)),
            "fetch pull request",
        )
        .await?;

        Ok(if pull.merged {
            ReviewState::Merged {
                merge_commit: pull.merge_commit_sha,
            }
        } else if pull.state == "closed" {
            ReviewState::Closed
        } else {
            ReviewState::Open
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::mock_api::MockApi;
    use axum::http::Method;
    use lander_core::LanderError;

    fn request(draft: bool) -> ReviewRequest {
        ReviewRequest {
            branch: "autofix/bug-fix-20260101-abc123".to_string(),
            base_branch: "main".to_string(),
            title: "fix(src): guard against empty input".to_string(),
            description: "## Summary\n\nGuard".to_string(),
            draft,
            reviewers: vec!["alice".to_string()],
            labels: vec!["automated-fix".to_string()],
        }
    }

    #[tokio::test]
    async fn creates_pull_request_with_reviewers_and_labels() {
        let api = MockApi::start(vec![
            (
                Method::POST,
                "/repos/acme/app/pulls",
                json!({ "number": 42, "html_url": "https://github.com/acme/app/pull/42" }),
            ),
            (
                Method::POST,
                "/repos/acme/app/pulls/42/requested_reviewers",
                json!({}),
            ),
            (Method::POST, "/repos/acme/app/issues/42/labels", json!([])),
        ])
        .await;
        let provider = GithubProvider::new(&api.base_url, "acme", "app", "t0ken".to_string());

        let handle = provider.create_review(&request(true)).await.unwrap();
        assert_eq!(handle.id, 42);
        assert_eq!(handle.url, "https://github.com/acme/app/pull/42");

        let created = api.find("POST", "/repos/acme/app/pulls").unwrap();
        assert_eq!(created.body["head"], "autofix/bug-fix-20260101-abc123");
        assert_eq!(created.body["base"], "main");
        assert_eq!(created.body["draft"], true);
        assert_eq!(created.authorization.as_deref(), Some("Bearer t0ken"));

        let reviewers = api
            .find("POST", "/repos/acme/app/pulls/42/requested_reviewers")
            .unwrap();
        assert_eq!(reviewers.body["reviewers"][0], "alice");
        assert!(api.find("POST", "/repos/acme/app/issues/42/labels").is_some());
    }

    #[tokio::test]
    async fn label_failure_does_not_fail_creation() {
        let api = MockApi::start(vec![(
            Method::POST,
            "/repos/acme/app/pulls",
            json!({ "number": 7, "html_url": "https://github.com/acme/app/pull/7" }),
        )])
        .await;
        let provider = GithubProvider::new(&api.base_url, "acme", "app", "t".to_string());
        let handle = provider.create_review(&request(false)).await.unwrap();
        assert_eq!(handle.id, 7);
    }

    #[tokio::test]
    async fn rejected_creation_is_review_error() {
        let api = MockApi::start(Vec::new()).await;
        let provider = GithubProvider::new(&api.base_url, "acme", "app", "t".to_string());
        let err = provider.create_review(&request(false)).await.unwrap_err();
        assert!(matches!(err, LanderError::Review(_)));
    }

    #[tokio::test]
    async fn close_comments_then_closes() {
        let api = MockApi::start(vec![
            (Method::POST, "/repos/acme/app/issues/5/comments", json!({})),
            (Method::PATCH, "/repos/acme/app/pulls/5", json!({})),
        ])
        .await;
        let provider = GithubProvider::new(&api.base_url, "acme", "app", "t".to_string());
        provider.close_review(5, "rolled back").await.unwrap();

        let requests = api.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].body["body"], "rolled back");
        assert_eq!(requests[1].body["state"], "closed");
    }

    #[tokio::test]
    async fn state_reports_merge_commit() {
        let api = MockApi::start(vec![
            (
                Method::GET,
                "/repos/acme/app/pulls/1",
                json!({ "number": 1, "html_url": "u", "state": "closed", "merged": true, "merge_commit_sha": "deadbeef" }),
            ),
            (
                Method::GET,
                "/repos/acme/app/pulls/2",
                json!({ "number": 2, "html_url": "u", "state": "closed", "merged": false }),
            ),
            (
                Method::GET,
                "/repos/acme/app/pulls/3",
                json!({ "number": 3, "html_url": "u", "state": "open", "merged": false }),
            ),
        ])
        .await;
        let provider = GithubProvider::new(&api.base_url, "acme", "app", "t".to_string());

        assert_eq!(
            provider.review_state(1).await.unwrap(),
            ReviewState::Merged {
                merge_commit: Some("deadbeef".to_string())
            }
        );
        assert_eq!(provider.review_state(2).await.unwrap(), ReviewState::Closed);
        assert_eq!(provider.review_state(3).await.unwrap(), ReviewState::Open);
    }
}
