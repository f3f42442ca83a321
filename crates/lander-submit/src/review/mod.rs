//! Remote review gateway: pull/merge requests on one hosting provider
//!
//! Each deployment talks to exactly one provider, picked from configuration
//! when the gateway is built. Every provider offers the same capability set:
//! open a review, close it with a reason, and report its current state.

pub mod bitbucket;
pub mod gh_cli;
pub mod github;
pub mod gitlab;

#[cfg(test)]
pub(crate) mod mock_api;

use std::path::Path;

use async_trait::async_trait;
use lander_core::{LanderError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{resolve_secret, LanderConfig, ProviderConfig};

pub use bitbucket::BitbucketProvider;
pub use gh_cli::GhCliProvider;
pub use github::GithubProvider;
pub use gitlab::GitlabProvider;

/// Everything a provider needs to open a review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewRequest {
    pub branch: String,
    pub base_branch: String,
    pub title: String,
    pub description: String,
    pub draft: bool,
    #[serde(default)]
    pub reviewers: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Identifier and web location of an opened review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewHandle {
    pub id: u64,
    pub url: String,
}

/// Where a review currently stands on the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReviewState {
    Open,
    Merged { merge_commit: Option<String> },
    Closed,
}

/// One hosting provider's review API.
#[async_trait]
pub trait ReviewProvider: Send + Sync {
    /// Provider display name (for logs and CLI output)
    fn name(&self) -> &str;

    /// Open a review for `request.branch` against `request.base_branch`.
    async fn create_review(&self, request: &ReviewRequest) -> Result<ReviewHandle>;

    /// Close an open review without merging, leaving `reason` as a comment.
    async fn close_review(&self, id: u64, reason: &str) -> Result<()>;

    /// Query the review's current state.
    async fn review_state(&self, id: u64) -> Result<ReviewState>;
}

/// Entry point for remote reviews, bound to at most one provider.
pub struct ReviewGateway {
    provider: Option<Box<dyn ReviewProvider>>,
}

impl ReviewGateway {
    /// Build the provider named by `config.provider`, if any.
    pub fn from_config(config: &LanderConfig, work_dir: &Path) -> Result<Self> {
        let provider: Option<Box<dyn ReviewProvider>> = match &config.provider {
            None => None,
            Some(ProviderConfig::Github {
                owner,
                repo,
                api_url,
                token,
                token_env,
            }) => Some(Box::new(GithubProvider::new(
                api_url,
                owner,
                repo,
                resolve_secret(token, token_env)?,
            ))),
            Some(ProviderConfig::Gitlab {
                project,
                api_url,
                token,
                token_env,
            }) => Some(Box::new(GitlabProvider::new(
                api_url,
                project,
                resolve_secret(token, token_env)?,
            ))),
            Some(ProviderConfig::Bitbucket {
                workspace,
                repo_slug,
                username,
                api_url,
                app_password,
                token_env,
            }) => Some(Box::new(BitbucketProvider::new(
                api_url,
                workspace,
                repo_slug,
                username,
                resolve_secret(app_password, token_env)?,
            ))),
            Some(ProviderConfig::GithubCli) => Some(Box::new(GhCliProvider::new(work_dir))),
        };

        if let Some(p) = &provider {
            tracing::info!("review gateway using provider {}", p.name());
        }
        Ok(Self { provider })
    }

    /// Gateway bound to an explicit provider.
    pub fn with_provider(provider: Box<dyn ReviewProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Gateway with no provider; every call fails.
    pub fn unconfigured() -> Self {
        Self { provider: None }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_ref().map(|p| p.name())
    }

    fn provider(&self) -> Result<&dyn ReviewProvider> {
        self.provider.as_deref().ok_or_else(|| {
            LanderError::IntegrationNotConfigured(
                "no review provider configured; add a [provider] block".to_string(),
            )
        })
    }

    pub async fn create_review(&self, request: &ReviewRequest) -> Result<ReviewHandle> {
        let provider = self.provider()?;
        tracing::info!(
            "opening {}review on {}: {} -> {}",
            if request.draft { "draft " } else { "" },
            provider.name(),
            request.branch,
            request.base_branch
        );
        provider.create_review(request).await
    }

    pub async fn close_review(&self, id: u64, reason: &str) -> Result<()> {
        let provider = self.provider()?;
        tracing::info!("closing review #{} on {}", id, provider.name());
        provider.close_review(id, reason).await
    }

    pub async fn review_state(&self, id: u64) -> Result<ReviewState> {
        self.provider()?.review_state(id).await
    }
}

/// Send a request and decode the JSON answer, mapping every failure to
/// [`LanderError::Review`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    action: &str,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| LanderError::Review(format!("{} failed: {}", action, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LanderError::Review(format!(
            "{} returned {}: {}",
            action, status, body
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| LanderError::Review(format!("{} returned an unreadable body: {}", action, e)))
}

/// Shared HTTP client settings for provider adapters.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("lander/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
