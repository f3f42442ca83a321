//! Bitbucket Cloud pull requests over the 2.0 REST API.

use async_trait::async_trait;
use lander_core::Result;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{http_client, send_json, ReviewHandle, ReviewProvider, ReviewRequest, ReviewState};

pub struct BitbucketProvider {
    client: reqwest::Client,
    api_url: String,
    workspace: String,
    repo_slug: String,
    username: String,
    app_password: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    id: u64,
    #[serde(default)]
    state: String,
    #[serde(default)]
    links: Option<Links>,
    #[serde(default)]
    merge_commit: Option<CommitRef>,
}

#[derive(Debug, Deserialize)]
struct Links {
    html: Option<Href>,
}

#[derive(Debug, Deserialize)]
struct Href {
    href: String,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    hash: String,
}

impl BitbucketProvider {
    pub fn new(
        api_url: &str,
        workspace: &str,
        repo_slug: &str,
        username: &str,
        app_password: String,
    ) -> Self {
        Self {
            client: http_client(),
            api_url: api_url.trim_end_matches('/').to_string(),
            workspace: workspace.to_string(),
            repo_slug: repo_slug.to_string(),
            username: username.to_string(),
            app_password,
        }
    }

    fn request(&self, method: reqwest::Method, tail: &str) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/repositories/{}/{}/pullrequests{}",
            self.api_url, self.workspace, self.repo_slug, tail
        );
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.app_password))
    }
}

/// Bitbucket Cloud addresses users by `{uuid}` or Atlassian account id.
fn reviewer_ref(reviewer: &str) -> Value {
    if reviewer.starts_with('{') && reviewer.ends_with('}') {
        json!({ "uuid": reviewer })
    } else {
        json!({ "account_id": reviewer })
    }
}

#[async_trait]
impl ReviewProvider for BitbucketProvider {
    fn name(&self) -> &str {
        "bitbucket"
    }

    async fn create_review(&self, request: &ReviewRequest) -> Result<ReviewHandle> {
        let mut body = json!({
            "title": request.title,
            "description": request.description,
            "source": { "branch": { "name": request.branch } },
            "destination": { "branch": { "name": request.base_branch } },
            "close_source_branch": false,
            "draft": request.draft,
        });
        if !request.reviewers.is_empty() {
            body["reviewers"] = json!(request
                .reviewers
                .iter()
                .map(|r| reviewer_ref(r))
                .collect::<Vec<_>>());
        }

        let pr: PullRequestResponse = send_json(
            self.request(reqwest::Method::POST, "").json(&body),
            "create pull request",
        )
        .await?;

        let url = pr
            .links
            .and_then(|l| l.html)
            .map(|h| h.href)
            .unwrap_or_else(|| {
                format!(
                    "https://bitbucket.org/{}/{}/pull-requests/{}",
                    self.workspace, self.repo_slug, pr.id
                )
            });

        tracing::info!("created PR #{}: {}", pr.id, url);
        Ok(ReviewHandle { id: pr.id, url })
    }

    async fn close_review(&self, id: u64, reason: &str) -> Result<()> {
        send_json::<Value>(
            self.request(reqwest::Method::POST, &format!("/{}/comments", id))
                .json(&json!({ "content": { "raw": reason } })),
            "comment on pull request",
        )
        .await?;
        send_json::<Value>(
            self.request(reqwest::Method::POST, &format!("/{}/decline", id)),
            "decline pull request",
        )
        .await?;
        Ok(())
    }

    async fn review_state(&self, id: u64) -> Result<ReviewState> {
        let pr: PullRequestResponse = send_json(
            self.request(reqwest::Method::GET, &format!("/{}", id)),
            "fetch pull request",
        )
        .await?;

        Ok(match pr.state.as_str() {
            "MERGED" => ReviewState::Merged {
                merge_commit: pr.merge_commit.map(|c| c.hash),
            },
            "DECLINED" | "SUPERSEDED" => ReviewState::Closed,
            _ => ReviewState::Open,
        })
    }
}
