//! GitLab merge requests over the v4 REST API.

use async_trait::async_trait;
use lander_core::Result;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{http_client, send_json, ReviewHandle, ReviewProvider, ReviewRequest, ReviewState};

pub struct GitlabProvider {
    client: reqwest::Client,
    api_url: String,
    project: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct MergeRequestResponse {
    iid: u64,
    web_url: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    merge_commit_sha: Option<String>,
}

impl GitlabProvider {
    pub fn new(api_url: &str, project: &str, token: String) -> Self {
        Self {
            client: http_client(),
            api_url: api_url.trim_end_matches('/').to_string(),
            project: project.to_string(),
            token,
        }
    }

    /// Project path with `/` percent-encoded, or a numeric id as-is.
    fn project_id(&self) -> String {
        self.project.replace('/', "%2F")
    }

    fn request(&self, method: reqwest::Method, tail: &str) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/projects/{}/merge_requests{}",
            self.api_url,
            self.project_id(),
            tail
        );
        self.client
            .request(method, url)
            .header("PRIVATE-TOKEN", &self.token)
    }
}

#[async_trait]
impl ReviewProvider for GitlabProvider {
    fn name(&self) -> &str {
        "gitlab"
    }

    async fn create_review(&self, request: &ReviewRequest) -> Result<ReviewHandle> {
        let title = if request.draft {
            format!("Draft: {}", request.title)
        } else {
            request.title.clone()
        };

        let mut body = json!({
            "source_branch": request.branch,
            "target_branch": request.base_branch,
            "title": title,
            "description": request.description,
        });
        if !request.labels.is_empty() {
            body["labels"] = json!(request.labels.join(","));
        }
        if !request.reviewers.is_empty() {
            // GitLab wants numeric user ids; usernames are mentioned instead.
            let mentions: Vec<String> = request.reviewers.iter().map(|r| format!("@{}", r)).collect();
            body["description"] = json!(format!(
                "{}\n\nReviewers: {}",
                request.description,
                mentions.join(" ")
            ));
        }

        let mr: MergeRequestResponse = send_json(
            self.request(reqwest::Method::POST, "").json(&body),
            "create merge request",
        )
        .await?;

        tracing::info!("created MR !{}: {}", mr.iid, mr.web_url);
        Ok(ReviewHandle {
            id: mr.iid,
            url: mr.web_url,
        })
    }

    async fn close_review(&self, id: u64, reason: &str) -> Result<()> {
        send_json::<Value>(
            self.request(reqwest::Method::POST, &format!("/{}/notes", id))
                .json(&json!({ "body": reason })),
            "comment on merge request",
        )
        .await?;
        send_json::<Value>(
            self.request(reqwest::Method::PUT, &format!("/{}", id))
                .json(&json!({ "state_event": "close" })),
            "close merge request",
        )
        .await?;
        Ok(())
    }

    async fn review_state(&self, id: u64) -> Result<ReviewState> {
        let mr: MergeRequestResponse = send_json(
            self.request(reqwest::Method::GET, &format!("/{}", id)),
            "fetch merge request",
        )
        .await?;

        Ok(match mr.state.as_str() {
            "merged" => ReviewState::Merged {
                merge_commit: mr.merge_commit_sha,
            },
            "closed" => ReviewState::Closed,
            _ => ReviewState::Open,
        })
    }
}
