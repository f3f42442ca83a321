//! Pipeline configuration structures

use serde::{Deserialize, Serialize};
use std::path::Path;

use lander_core::{CommitAuthor, LanderError, LandingStrategy};

/// Top-level pipeline configuration from .lander/config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanderConfig {
    /// Master switch for the whole pipeline
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Strategy used when no risk rule picks one
    #[serde(default = "default_strategy")]
    pub default_strategy: LandingStrategy,

    #[serde(default)]
    pub git: GitSettings,

    #[serde(default)]
    pub commit: CommitSettings,

    #[serde(default)]
    pub review: ReviewSettings,

    #[serde(default)]
    pub rollback: RollbackSettings,

    #[serde(default)]
    pub security: SecuritySettings,

    /// The single remote review provider for this deployment
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
}

impl Default for LanderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_strategy: default_strategy(),
            git: GitSettings::default(),
            commit: CommitSettings::default(),
            review: ReviewSettings::default(),
            rollback: RollbackSettings::default(),
            security: SecuritySettings::default(),
            provider: None,
        }
    }
}

/// Git driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitSettings {
    /// Base branch fixes land on (e.g., "main", "develop")
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Branch naming prefix (e.g., "autofix/")
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,

    /// Git remote name
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default)]
    pub author_name: String,

    #[serde(default)]
    pub author_email: String,

    #[serde(default)]
    pub sign_commits: bool,

    /// Key id passed to `git commit -S`; the user's default key when absent
    #[serde(default)]
    pub signing_key: Option<String>,

    /// Pull the base branch before branching off it
    #[serde(default = "default_true")]
    pub pull_before_branch: bool,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
            branch_prefix: default_branch_prefix(),
            remote: default_remote(),
            author_name: String::new(),
            author_email: String::new(),
            sign_commits: false,
            signing_key: None,
            pull_before_branch: true,
        }
    }
}

impl GitSettings {
    pub fn author(&self) -> CommitAuthor {
        CommitAuthor {
            name: self.author_name.clone(),
            email: self.author_email.clone(),
        }
    }
}

/// Commit message configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSettings {
    #[serde(default = "default_true")]
    pub use_conventional_format: bool,

    /// Append `(#<issue>)` to the subject
    #[serde(default = "default_true")]
    pub include_issue_id: bool,

    /// Add score and test counts to the body
    #[serde(default = "default_true")]
    pub include_verification_info: bool,

    #[serde(default = "default_max_subject_length")]
    pub max_subject_length: usize,

    /// Refuse fixes without a description
    #[serde(default)]
    pub require_description: bool,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            use_conventional_format: true,
            include_issue_id: true,
            include_verification_info: true,
            max_subject_length: default_max_subject_length(),
            require_description: false,
        }
    }
}

/// Remote review configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSettings {
    /// When off, review strategies degrade to branch-only
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub default_reviewers: Vec<String>,

    #[serde(default = "default_labels")]
    pub default_labels: Vec<String>,

    /// Never land without a review (disables direct commits)
    #[serde(default)]
    pub require_review: bool,

    #[serde(default)]
    pub auto_merge: bool,

    #[serde(default = "default_auto_merge_threshold")]
    pub auto_merge_score_threshold: f64,

    #[serde(default = "default_true")]
    pub delete_branch_after_merge: bool,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_reviewers: Vec::new(),
            default_labels: default_labels(),
            require_review: false,
            auto_merge: false,
            auto_merge_score_threshold: default_auto_merge_threshold(),
            delete_branch_after_merge: true,
        }
    }
}

/// Rollback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Hard-reset the working copy when a landing attempt fails
    #[serde(default = "default_true")]
    pub auto_rollback_on_failure: bool,

    /// Keep the feature branch after a rollback
    #[serde(default)]
    pub keep_rollback_branch: bool,
}

impl Default for RollbackSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_rollback_on_failure: true,
            keep_rollback_branch: false,
        }
    }
}

/// Limits on what a single landing may touch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySettings {
    /// Empty means every path not forbidden is allowed
    #[serde(default)]
    pub allowed_file_patterns: Vec<String>,

    #[serde(default = "default_forbidden_patterns")]
    pub forbidden_file_patterns: Vec<String>,

    #[serde(default = "default_max_files")]
    pub max_files_per_commit: usize,

    #[serde(default = "default_max_lines")]
    pub max_lines_per_commit: usize,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            allowed_file_patterns: Vec::new(),
            forbidden_file_patterns: default_forbidden_patterns(),
            max_files_per_commit: default_max_files(),
            max_lines_per_commit: default_max_lines(),
        }
    }
}

/// Endpoint and credentials for the one remote review provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProviderConfig {
    Github {
        owner: String,
        repo: String,
        #[serde(default = "default_github_api")]
        api_url: String,
        #[serde(default)]
        token: Option<String>,
        #[serde(default = "default_github_token_env")]
        token_env: String,
    },
    Gitlab {
        /// Numeric id or `group/project` path
        project: String,
        #[serde(default = "default_gitlab_api")]
        api_url: String,
        #[serde(default)]
        token: Option<String>,
        #[serde(default = "default_gitlab_token_env")]
        token_env: String,
    },
    Bitbucket {
        workspace: String,
        repo_slug: String,
        username: String,
        #[serde(default = "default_bitbucket_api")]
        api_url: String,
        #[serde(default)]
        app_password: Option<String>,
        #[serde(default = "default_bitbucket_token_env")]
        token_env: String,
    },
    /// Uses the authenticated `gh` CLI in the working copy
    GithubCli,
}

impl ProviderConfig {
    /// Provider display name (for logs and CLI output)
    pub fn name(&self) -> &str {
        match self {
            ProviderConfig::Github { .. } => "github",
            ProviderConfig::Gitlab { .. } => "gitlab",
            ProviderConfig::Bitbucket { .. } => "bitbucket",
            ProviderConfig::GithubCli => "github-cli",
        }
    }
}

/// Inline secret if set, otherwise the named environment variable.
pub fn resolve_secret(inline: &Option<String>, env_var: &str) -> Result<String, LanderError> {
    if let Some(secret) = inline.as_ref().filter(|s| !s.is_empty()) {
        return Ok(secret.clone());
    }
    std::env::var(env_var)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            LanderError::Configuration(format!(
                "no provider credentials: set `token` or the {} environment variable",
                env_var
            ))
        })
}

// Serde default functions
fn default_true() -> bool {
    true
}

fn default_strategy() -> LandingStrategy {
    LandingStrategy::PullRequest
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_branch_prefix() -> String {
    "autofix/".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_max_subject_length() -> usize {
    72
}

fn default_labels() -> Vec<String> {
    vec!["automated-fix".to_string()]
}

fn default_auto_merge_threshold() -> f64 {
    0.95
}

fn default_forbidden_patterns() -> Vec<String> {
    [
        ".env",
        ".env.*",
        "*.pem",
        "*.key",
        "id_rsa*",
        ".git/**",
        "secrets/**",
        "**/secrets/**",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_max_files() -> usize {
    20
}

fn default_max_lines() -> usize {
    1000
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_gitlab_api() -> String {
    "https://gitlab.com/api/v4".to_string()
}

fn default_gitlab_token_env() -> String {
    "GITLAB_TOKEN".to_string()
}

fn default_bitbucket_api() -> String {
    "https://api.bitbucket.org/2.0".to_string()
}

fn default_bitbucket_token_env() -> String {
    "BITBUCKET_APP_PASSWORD".to_string()
}

impl LanderConfig {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self, LanderError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| LanderError::io(path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| LanderError::Configuration(format!("{}: {}", path.display(), e)))
    }

    /// Try to load config, returning default if the file doesn't exist or is invalid
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), LanderError> {
        if self.git.author_name.trim().is_empty() || self.git.author_email.trim().is_empty() {
            return Err(LanderError::Configuration(
                "git.author_name and git.author_email are required".to_string(),
            ));
        }
        if self.git.default_branch.trim().is_empty() {
            return Err(LanderError::Configuration(
                "git.default_branch must not be empty".to_string(),
            ));
        }
        if self.commit.max_subject_length < 10 {
            return Err(LanderError::Configuration(format!(
                "commit.max_subject_length must be at least 10, got {}",
                self.commit.max_subject_length
            )));
        }
        if !(0.0..=1.0).contains(&self.review.auto_merge_score_threshold) {
            return Err(LanderError::Configuration(format!(
                "review.auto_merge_score_threshold must be within 0..=1, got {}",
                self.review.auto_merge_score_threshold
            )));
        }
        Ok(())
    }
}
