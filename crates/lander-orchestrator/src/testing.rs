//! In-memory stand-ins for the git driver and a review provider.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use lander_core::{
    EstimatedImpact, Fix, FixAction, Issue, LanderError, Result, TestSummary, VerificationResult,
};
use lander_submit::path_policy;
use lander_submit::{
    CommitMessage, LanderConfig, ReviewHandle, ReviewProvider, ReviewRequest, ReviewState,
    SecuritySettings, SourceControl,
};

/// Records every call as a short string such as `push:main`.
pub(crate) struct FakeVcs {
    base: String,
    security: SecuritySettings,
    calls: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
    head: Mutex<String>,
    commits: AtomicU64,
    delay: Option<Duration>,
    revert_gate: Option<RevertGate>,
}

/// Holds `revert` until released, after signalling that it was reached.
#[derive(Clone, Default)]
pub(crate) struct RevertGate {
    pub reached: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl FakeVcs {
    pub(crate) fn new(config: &LanderConfig) -> Self {
        Self {
            base: config.git.default_branch.clone(),
            security: config.security.clone(),
            calls: Mutex::new(Vec::new()),
            fail_on: Mutex::new(None),
            head: Mutex::new("base0000".to_string()),
            commits: AtomicU64::new(0),
            delay: None,
            revert_gate: None,
        }
    }

    /// Sleep inside branch creation so concurrent callers overlap.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Pause inside `revert` until `gate.release` is notified.
    pub(crate) fn with_revert_gate(mut self, gate: RevertGate) -> Self {
        self.revert_gate = Some(gate);
        self
    }

    /// Make the first call whose name starts with `op` fail.
    pub(crate) fn fail_on(&self, op: &str) {
        *self.fail_on.lock().unwrap() = Some(op.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn call(&self, name: String) -> Result<()> {
        self.calls.lock().unwrap().push(name.clone());
        let mut fail_on = self.fail_on.lock().unwrap();
        if fail_on.as_deref().is_some_and(|op| name.starts_with(op)) {
            *fail_on = None;
            return Err(LanderError::GitCommand {
                command: format!("git {}", name),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(())
    }

    fn next_commit(&self) -> String {
        let n = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
        let hash = format!("commit{:04}", n);
        *self.head.lock().unwrap() = hash.clone();
        hash
    }
}

#[async_trait]
impl SourceControl for FakeVcs {
    fn base_branch(&self) -> &str {
        &self.base
    }

    async fn checkout_base(&self) -> Result<()> {
        self.call("checkout_base".to_string())
    }

    async fn create_branch(&self, fix: &Fix, _issue: Option<&Issue>) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let branch = format!("autofix/{}", fix.id);
        self.call(format!("create_branch:{}", branch))?;
        Ok(branch)
    }

    async fn apply_changes(&self, fix: &Fix) -> Result<Vec<String>> {
        self.call("apply_changes".to_string())?;
        path_policy::check_fix(fix, &self.security)?;
        Ok(fix.touched_files())
    }

    async fn create_commit(&self, message: &CommitMessage) -> Result<String> {
        self.call(format!("commit:{}", message.subject))?;
        Ok(self.next_commit())
    }

    async fn push(&self, branch: Option<&str>) -> Result<()> {
        self.call(format!("push:{}", branch.unwrap_or(&self.base)))
    }

    async fn revert(&self, commit: &str) -> Result<String> {
        self.call(format!("revert:{}", commit))?;
        if let Some(gate) = &self.revert_gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
        Ok(self.next_commit())
    }

    async fn switch_to(&self, branch: &str) -> Result<()> {
        self.call(format!("switch_to:{}", branch))
    }

    async fn head(&self) -> Result<String> {
        Ok(self.head.lock().unwrap().clone())
    }

    async fn reset_hard(&self, commit: &str) -> Result<()> {
        self.call(format!("reset_hard:{}", commit))?;
        *self.head.lock().unwrap() = commit.to_string();
        Ok(())
    }

    async fn delete_branch(&self, name: &str) {
        let _ = self.call(format!("delete_branch:{}", name));
    }
}

/// Review provider keeping requests in shared memory. Clones share state.
#[derive(Clone, Default)]
pub(crate) struct FakeReviews {
    pub created: Arc<Mutex<Vec<ReviewRequest>>>,
    pub closed: Arc<Mutex<Vec<(u64, String)>>>,
    pub state: Arc<Mutex<Option<ReviewState>>>,
    pub fail_create: Arc<Mutex<bool>>,
}

#[async_trait]
impl ReviewProvider for FakeReviews {
    fn name(&self) -> &str {
        "fake"
    }

    async fn create_review(&self, request: &ReviewRequest) -> Result<ReviewHandle> {
        if *self.fail_create.lock().unwrap() {
            return Err(LanderError::Review("provider unavailable".to_string()));
        }
        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        let id = created.len() as u64;
        Ok(ReviewHandle {
            id,
            url: format!("https://reviews.example.com/{}", id),
        })
    }

    async fn close_review(&self, id: u64, reason: &str) -> Result<()> {
        self.closed.lock().unwrap().push((id, reason.to_string()));
        Ok(())
    }

    async fn review_state(&self, _id: u64) -> Result<ReviewState> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(ReviewState::Open))
    }
}

pub(crate) fn config() -> LanderConfig {
    let mut config = LanderConfig::default();
    config.git.author_name = "Fix Bot".to_string();
    config.git.author_email = "fixbot@example.com".to_string();
    config
}

pub(crate) fn fix(id: &str, files: &[&str], risk_score: f64) -> Fix {
    Fix {
        id: id.to_string(),
        fix_type: "bug-fix".to_string(),
        description: "Guard against empty input".to_string(),
        strategy: "template".to_string(),
        actions: files
            .iter()
            .map(|f| FixAction {
                file: f.to_string(),
                start_line: 1,
                end_line: 3,
                new_content: "fn main() {}\n".to_string(),
            })
            .collect(),
        estimated_impact: EstimatedImpact {
            files_changed: files.len(),
            lines_changed: 3 * files.len(),
            risk_score,
        },
        breaking_change: false,
    }
}

pub(crate) fn verification(score: f64) -> VerificationResult {
    VerificationResult {
        overall_score: score,
        approval_required: false,
        summary: TestSummary {
            passed: 12,
            total: 12,
        },
        warnings: Vec::new(),
        recommendations: Vec::new(),
    }
}
