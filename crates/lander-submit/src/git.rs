//! Git driver: branches, file application, commits, pushes, and reverts

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use lander_core::{Fix, Issue, LanderError, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::process::Command;

use crate::config::{GitSettings, LanderConfig, SecuritySettings};
use crate::message::{normalize_category, CommitMessage};
use crate::path_policy;

/// Version-control operations a landing attempt is built from.
///
/// Every call blocks the attempt until the underlying tool finishes and
/// surfaces failures as [`LanderError::GitCommand`]. The trait lets the
/// orchestrator run against a real working copy or an in-memory fake.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// The branch fixes land on.
    fn base_branch(&self) -> &str;

    /// Check out the base branch and pull it.
    async fn checkout_base(&self) -> Result<()>;

    /// Check out the base branch, pull, and create + check out a feature branch.
    async fn create_branch(&self, fix: &Fix, issue: Option<&Issue>) -> Result<String>;

    /// Write and stage every file of the fix after checking the path policy.
    async fn apply_changes(&self, fix: &Fix) -> Result<Vec<String>>;

    /// Commit staged changes and return the new commit hash.
    async fn create_commit(&self, message: &CommitMessage) -> Result<String>;

    /// Push `branch`, or the base branch when `None`.
    async fn push(&self, branch: Option<&str>) -> Result<()>;

    /// Create a commit undoing `commit` on the current branch; returns its hash.
    async fn revert(&self, commit: &str) -> Result<String>;

    /// Check out an existing branch and bring it up to date.
    async fn switch_to(&self, branch: &str) -> Result<()>;

    /// Current HEAD commit.
    async fn head(&self) -> Result<String>;

    /// Discard everything after `commit` on the current branch.
    async fn reset_hard(&self, commit: &str) -> Result<()>;

    /// Best-effort local and remote deletion; failures are logged only.
    async fn delete_branch(&self, name: &str);
}

/// Git driver shelling out to the `git` binary in one working copy.
pub struct GitDriver {
    work_dir: PathBuf,
    settings: GitSettings,
    security: SecuritySettings,
    conventional: bool,
}

impl GitDriver {
    /// Create a driver for the given working directory
    pub fn new(work_dir: impl Into<PathBuf>, config: &LanderConfig) -> Self {
        Self {
            work_dir: work_dir.into(),
            settings: config.git.clone(),
            security: config.security.clone(),
            conventional: config.commit.use_conventional_format,
        }
    }

    /// Run a git command in the working directory
    async fn git_cmd(&self, args: &[&str]) -> Result<String> {
        let command = format!("git {}", args.join(" "));
        tracing::debug!("GitDriver: {}", command);

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .await
            .map_err(|e| LanderError::GitCommand {
                command: command.clone(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(LanderError::GitCommand { command, stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run a commit-producing command with the configured identity.
    async fn git_as_author(&self, args: &[&str]) -> Result<String> {
        let name = format!("user.name={}", self.settings.author_name);
        let email = format!("user.email={}", self.settings.author_email);
        let mut full = vec!["-c", name.as_str(), "-c", email.as_str()];
        full.extend_from_slice(args);
        self.git_cmd(&full).await
    }

    fn signing_flag(&self) -> String {
        match (self.settings.sign_commits, &self.settings.signing_key) {
            (true, Some(key)) => format!("--gpg-sign={}", key),
            (true, None) => "--gpg-sign".to_string(),
            (false, _) => "--no-gpg-sign".to_string(),
        }
    }

    /// Get current branch name
    pub async fn current_branch(&self) -> Result<String> {
        self.git_cmd(&["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    async fn has_remote(&self) -> bool {
        match self.git_cmd(&["remote"]).await {
            Ok(out) => out.lines().any(|r| r.trim() == self.settings.remote),
            Err(_) => false,
        }
    }

    async fn pull(&self, branch: &str) -> Result<()> {
        if !self.has_remote().await {
            tracing::debug!(
                "GitDriver: no remote {}, skipping pull",
                self.settings.remote
            );
            return Ok(());
        }
        self.git_cmd(&["pull", "--ff-only", &self.settings.remote, branch])
            .await?;
        Ok(())
    }

    /// Generate `<prefix><fix-type>-<YYYYMMDD>[-<issue>]-<random6>`
    pub fn branch_name(&self, fix: &Fix, issue: Option<&Issue>) -> String {
        let fix_type = match normalize_category(&fix.fix_type) {
            t if t.is_empty() => "fix".to_string(),
            t => t,
        };
        let date = Utc::now().format("%Y%m%d");
        let issue_part = issue
            .map(|i| sanitize_ref(&i.id))
            .filter(|s| !s.is_empty())
            .map(|s| format!("-{}", s))
            .unwrap_or_default();
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();

        format!(
            "{}{}-{}{}-{}",
            self.settings.branch_prefix, fix_type, date, issue_part, suffix
        )
    }
}

/// Lowercase, keep alphanumerics, and collapse everything else to `-`.
fn sanitize_ref(raw: &str) -> String {
    let mapped: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    mapped
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[async_trait]
impl SourceControl for GitDriver {
    fn base_branch(&self) -> &str {
        &self.settings.default_branch
    }

    async fn checkout_base(&self) -> Result<()> {
        let base = self.settings.default_branch.clone();
        self.git_cmd(&["checkout", &base]).await?;
        if self.settings.pull_before_branch {
            self.pull(&base).await?;
        }
        Ok(())
    }

    async fn create_branch(&self, fix: &Fix, issue: Option<&Issue>) -> Result<String> {
        self.checkout_base().await?;

        let branch = self.branch_name(fix, issue);
        tracing::info!("GitDriver: creating branch {}", branch);
        self.git_cmd(&["checkout", "-b", &branch]).await?;
        Ok(branch)
    }

    async fn apply_changes(&self, fix: &Fix) -> Result<Vec<String>> {
        // Nothing is written unless every file passes.
        path_policy::check_fix(fix, &self.security)?;

        for action in &fix.actions {
            let full_path = self.work_dir.join(&action.file);
            if let Some(parent) = full_path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| LanderError::io(parent.display(), e))?;
            }
            tokio::fs::write(&full_path, &action.new_content)
                .await
                .map_err(|e| LanderError::io(full_path.display(), e))?;
        }

        let files = fix.touched_files();
        for file in &files {
            self.git_cmd(&["add", "--", file]).await?;
        }
        tracing::info!("GitDriver: staged {} file(s)", files.len());
        Ok(files)
    }

    async fn create_commit(&self, message: &CommitMessage) -> Result<String> {
        let text = message.render(self.conventional);
        let signing = self.signing_flag();
        self.git_as_author(&["commit", &signing, "-m", &text]).await?;

        let hash = self.head().await?;
        tracing::info!("GitDriver: committed {}", short(&hash));
        Ok(hash)
    }

    async fn push(&self, branch: Option<&str>) -> Result<()> {
        let target = branch.unwrap_or(&self.settings.default_branch);
        let remote = &self.settings.remote;
        tracing::info!("GitDriver: pushing {} to {}", target, remote);
        self.git_cmd(&["push", "-u", remote, target]).await?;
        Ok(())
    }

    async fn revert(&self, commit: &str) -> Result<String> {
        let parents = self
            .git_cmd(&["rev-list", "--parents", "-n", "1", commit])
            .await?;
        let is_merge = parents.split_whitespace().count() > 2;

        let signing = self.signing_flag();
        let mut args = vec!["revert", "--no-edit", signing.as_str()];
        if is_merge {
            args.extend_from_slice(&["-m", "1"]);
        }
        args.push(commit);
        self.git_as_author(&args).await?;

        let hash = self.head().await?;
        tracing::info!("GitDriver: reverted {} as {}", short(commit), short(&hash));
        Ok(hash)
    }

    async fn switch_to(&self, branch: &str) -> Result<()> {
        self.git_cmd(&["checkout", branch]).await?;
        self.pull(branch).await
    }

    async fn head(&self) -> Result<String> {
        self.git_cmd(&["rev-parse", "HEAD"]).await
    }

    async fn reset_hard(&self, commit: &str) -> Result<()> {
        self.git_cmd(&["reset", "--hard", commit]).await?;
        Ok(())
    }

    async fn delete_branch(&self, name: &str) {
        if name == self.settings.default_branch {
            tracing::warn!("GitDriver: refusing to delete base branch {}", name);
            return;
        }

        if let Ok(current) = self.current_branch().await {
            if current == name {
                let base = self.settings.default_branch.clone();
                if let Err(e) = self.git_cmd(&["checkout", &base]).await {
                    tracing::warn!("GitDriver: could not leave {}: {}", name, e);
                }
            }
        }

        if let Err(e) = self.git_cmd(&["branch", "-D", name]).await {
            tracing::warn!("GitDriver: local delete of {} failed: {}", name, e);
        }
        if self.has_remote().await {
            let remote = self.settings.remote.clone();
            if let Err(e) = self.git_cmd(&["push", &remote, "--delete", name]).await {
                tracing::warn!("GitDriver: remote delete of {} failed: {}", name, e);
            }
        }
    }
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lander_core::{EstimatedImpact, FixAction};
    use std::path::Path;
    use std::process::Command as StdCommand;
    use tempfile::{tempdir, TempDir};

    use crate::config::CommitSettings;
    use crate::message::compose_message;

    fn git(dir: &Path, args: &[&str]) -> String {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// A working copy on `main` with one commit, pushed to a bare remote.
    pub(crate) fn init_repo_with_remote() -> (TempDir, PathBuf, PathBuf) {
        let root = tempdir().unwrap();
        let remote = root.path().join("remote.git");
        let work = root.path().join("work");
        std::fs::create_dir_all(&remote).unwrap();
        std::fs::create_dir_all(&work).unwrap();

        git(&remote, &["init", "--bare"]);
        git(&work, &["init"]);
        git(&work, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&work, &["config", "user.name", "Test User"]);
        git(&work, &["config", "user.email", "test@example.com"]);
        git(&work, &["config", "commit.gpgsign", "false"]);
        std::fs::write(work.join("README.md"), "# Test\n").unwrap();
        git(&work, &["add", "."]);
        git(&work, &["commit", "-m", "Initial commit"]);
        git(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);
        git(&work, &["push", "-u", "origin", "main"]);

        (root, work, remote)
    }

    fn test_config() -> LanderConfig {
        let mut config = LanderConfig::default();
        config.git.author_name = "Fix Bot".to_string();
        config.git.author_email = "fixbot@example.com".to_string();
        config
    }

    fn test_fix(files: &[(&str, &str)]) -> Fix {
        Fix {
            id: "fix-1".to_string(),
            fix_type: "BugFix".to_string(),
            description: "Handle empty input".to_string(),
            strategy: "template".to_string(),
            actions: files
                .iter()
                .map(|(file, content)| FixAction {
                    file: file.to_string(),
                    start_line: 1,
                    end_line: 3,
                    new_content: content.to_string(),
                })
                .collect(),
            estimated_impact: EstimatedImpact {
                files_changed: files.len(),
                lines_changed: 3,
                risk_score: 0.1,
            },
            breaking_change: false,
        }
    }

    fn test_issue() -> Issue {
        Issue {
            id: "ISS 7".to_string(),
            issue_type: "bug".to_string(),
            severity: "high".to_string(),
            message: "panic on empty input".to_string(),
            file: None,
            line: None,
        }
    }

    #[test]
    fn branch_name_format() {
        let driver = GitDriver::new("/tmp/unused", &test_config());
        let name = driver.branch_name(&test_fix(&[("a.rs", "")]), Some(&test_issue()));

        let date = Utc::now().format("%Y%m%d").to_string();
        let expected_prefix = format!("autofix/bug-fix-{}-iss-7-", date);
        assert!(name.starts_with(&expected_prefix), "got {}", name);
        let suffix = &name[expected_prefix.len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn sanitize_ref_collapses_separators() {
        assert_eq!(sanitize_ref("JIRA--12 / x"), "jira-12-x");
        assert_eq!(sanitize_ref("!!!"), "");
    }

    #[tokio::test]
    async fn branch_commit_push_round() {
        let (_root, work, remote) = init_repo_with_remote();
        let config = test_config();
        let driver = GitDriver::new(&work, &config);
        let fix = test_fix(&[("src/parser/input.rs", "fn parse() {}\n")]);

        let branch = driver.create_branch(&fix, None).await.unwrap();
        assert_eq!(driver.current_branch().await.unwrap(), branch);

        let files = driver.apply_changes(&fix).await.unwrap();
        assert_eq!(files, vec!["src/parser/input.rs"]);
        assert!(work.join("src/parser/input.rs").exists());

        let verification = lander_core::VerificationResult {
            overall_score: 0.9,
            approval_required: false,
            summary: Default::default(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
        };
        let message = compose_message(&fix, &verification, None, &CommitSettings::default());
        let hash = driver.create_commit(&message).await.unwrap();
        assert_eq!(hash, git(&work, &["rev-parse", "HEAD"]));
        assert_eq!(git(&work, &["log", "-1", "--format=%an"]), "Fix Bot");
        assert!(git(&work, &["log", "-1", "--format=%s"]).starts_with("fix(parser): "));

        driver.push(Some(&branch)).await.unwrap();
        let remote_head = git(&remote, &["rev-parse", &format!("refs/heads/{}", branch)]);
        assert_eq!(remote_head, hash);
    }

    #[tokio::test]
    async fn forbidden_file_writes_nothing() {
        let (_root, work, _remote) = init_repo_with_remote();
        let driver = GitDriver::new(&work, &test_config());
        let fix = test_fix(&[("src/ok.rs", "ok"), ("config/.env", "SECRET=1")]);

        let err = driver.apply_changes(&fix).await.unwrap_err();
        assert!(matches!(err, LanderError::SecurityViolation { .. }));
        assert!(!work.join("src/ok.rs").exists());
        assert!(!work.join("config/.env").exists());
        assert!(git(&work, &["status", "--porcelain"]).is_empty());
    }

    #[tokio::test]
    async fn revert_restores_content() {
        let (_root, work, _remote) = init_repo_with_remote();
        let driver = GitDriver::new(&work, &test_config());
        let fix = test_fix(&[("README.md", "# Changed\n")]);

        driver.checkout_base().await.unwrap();
        driver.apply_changes(&fix).await.unwrap();
        let message = CommitMessage {
            commit_type: "docs".to_string(),
            scope: None,
            subject: "Update readme".to_string(),
            body: None,
            footer: None,
            breaking: false,
        };
        let original = driver.create_commit(&message).await.unwrap();
        let reverted = driver.revert(&original).await.unwrap();

        assert_ne!(original, reverted);
        assert_eq!(
            std::fs::read_to_string(work.join("README.md")).unwrap(),
            "# Test\n"
        );
        assert!(git(&work, &["log", "-1", "--format=%s"]).starts_with("Revert"));
    }

    #[tokio::test]
    async fn failing_command_reports_command_and_stderr() {
        let (_root, work, _remote) = init_repo_with_remote();
        let driver = GitDriver::new(&work, &test_config());

        let err = driver.switch_to("no-such-branch").await.unwrap_err();
        match err {
            LanderError::GitCommand { command, stderr } => {
                assert_eq!(command, "git checkout no-such-branch");
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn delete_branch_removes_local_and_remote() {
        let (_root, work, remote) = init_repo_with_remote();
        let driver = GitDriver::new(&work, &test_config());
        let fix = test_fix(&[("notes.txt", "n")]);

        let branch = driver.create_branch(&fix, None).await.unwrap();
        driver.push(Some(&branch)).await.unwrap();

        driver.delete_branch(&branch).await;

        assert_eq!(driver.current_branch().await.unwrap(), "main");
        assert!(git(&work, &["branch", "--list", &branch]).is_empty());
        assert!(git(&remote, &["branch", "--list", &branch]).is_empty());
    }

    #[tokio::test]
    async fn reset_hard_discards_commit() {
        let (_root, work, _remote) = init_repo_with_remote();
        let driver = GitDriver::new(&work, &test_config());
        let before = driver.head().await.unwrap();

        std::fs::write(work.join("extra.txt"), "x").unwrap();
        git(&work, &["add", "."]);
        git(&work, &["commit", "-m", "extra"]);
        driver.reset_hard(&before).await.unwrap();

        assert_eq!(driver.head().await.unwrap(), before);
        assert!(!work.join("extra.txt").exists());
    }
}
