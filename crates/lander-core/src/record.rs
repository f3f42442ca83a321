// record.rs — CommitRecord: one landing attempt and its outcome.
//
// The state machine enforces a valid lifecycle:
//   Pending → Preparing → Committed → PrCreated → Merged
//   Committed / PrCreated / Merged → RolledBack
//   (or Failed from any non-terminal state)
//
// A direct commit stops at Committed. Records are never deleted; they stay
// around for audit and statistics.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LanderError;

/// How a fix is integrated into the target repository.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum LandingStrategy {
    /// Commit straight onto the base branch.
    DirectCommit,
    /// Push a feature branch and open a review.
    PullRequest,
    /// Push a feature branch and open a draft review.
    DraftPullRequest,
    /// Push a feature branch without opening a review.
    BranchOnly,
}

impl LandingStrategy {
    pub const ALL: [LandingStrategy; 4] = [
        LandingStrategy::DirectCommit,
        LandingStrategy::PullRequest,
        LandingStrategy::DraftPullRequest,
        LandingStrategy::BranchOnly,
    ];

    /// Whether this strategy opens a remote review.
    pub fn creates_review(&self) -> bool {
        matches!(
            self,
            LandingStrategy::PullRequest | LandingStrategy::DraftPullRequest
        )
    }
}

impl fmt::Display for LandingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LandingStrategy::DirectCommit => write!(f, "direct-commit"),
            LandingStrategy::PullRequest => write!(f, "pull-request"),
            LandingStrategy::DraftPullRequest => write!(f, "draft-pull-request"),
            LandingStrategy::BranchOnly => write!(f, "branch-only"),
        }
    }
}

impl std::str::FromStr for LandingStrategy {
    type Err = LanderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct-commit" => Ok(LandingStrategy::DirectCommit),
            "pull-request" => Ok(LandingStrategy::PullRequest),
            "draft-pull-request" => Ok(LandingStrategy::DraftPullRequest),
            "branch-only" => Ok(LandingStrategy::BranchOnly),
            other => Err(LanderError::Configuration(format!(
                "unknown landing strategy: {}",
                other
            ))),
        }
    }
}

/// The lifecycle state of a CommitRecord.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CommitStatus {
    /// Record created, nothing touched yet.
    Pending,

    /// Branch, file, and commit work in progress.
    Preparing,

    /// A commit exists locally and, for direct commits, on the remote.
    Committed,

    /// A remote review has been opened for the pushed branch.
    PrCreated,

    /// The remote review was merged.
    Merged,

    /// The attempt failed; cleanup has been attempted.
    Failed { reason: String },

    /// The landed change was reverted.
    RolledBack,
}

impl fmt::Display for CommitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitStatus::Pending => write!(f, "pending"),
            CommitStatus::Preparing => write!(f, "preparing"),
            CommitStatus::Committed => write!(f, "committed"),
            CommitStatus::PrCreated => write!(f, "pr_created"),
            CommitStatus::Merged => write!(f, "merged"),
            CommitStatus::Failed { .. } => write!(f, "failed"),
            CommitStatus::RolledBack => write!(f, "rolled_back"),
        }
    }
}

impl CommitStatus {
    /// Check whether transitioning from this state to `next` is valid.
    pub fn can_transition_to(&self, next: &CommitStatus) -> bool {
        if matches!(next, CommitStatus::Failed { .. }) {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (CommitStatus::Pending, CommitStatus::Preparing)
                | (CommitStatus::Preparing, CommitStatus::Committed)
                | (CommitStatus::Committed, CommitStatus::PrCreated)
                | (CommitStatus::PrCreated, CommitStatus::Merged)
                | (CommitStatus::Committed, CommitStatus::RolledBack)
                | (CommitStatus::PrCreated, CommitStatus::RolledBack)
                | (CommitStatus::Merged, CommitStatus::RolledBack)
        )
    }

    /// Committed ends direct commits but not the review path, so it is not
    /// reported as terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CommitStatus::Merged | CommitStatus::Failed { .. } | CommitStatus::RolledBack
        )
    }
}

/// Identity used for commits, copied from configuration at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// Populated only once a record has been rolled back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RollbackInfo {
    pub original_commit: String,
    pub rollback_commit: String,
    pub reason: String,
    pub rolled_back_at: DateTime<Utc>,
}

/// Upstream signals captured when the record was created.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
    pub verification_score: f64,
    /// The verifier did not require human approval.
    pub auto_approved: bool,
    /// Review settings would allow this record to be merged without a human.
    #[serde(default)]
    pub auto_merge_eligible: bool,
}

/// One landing attempt for one fix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitRecord {
    pub id: Uuid,

    /// The upstream fix this attempt lands (not owned).
    pub fix_id: String,

    /// Fixed at creation.
    pub strategy: LandingStrategy,

    pub status: CommitStatus,

    /// Empty until the driver names it.
    pub branch: String,
    pub base_branch: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,

    pub title: String,
    pub description: String,
    pub files: Vec<String>,
    pub author: CommitAuthor,
    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_info: Option<RollbackInfo>,

    pub metadata: RecordMetadata,

    pub updated_at: DateTime<Utc>,
}

impl CommitRecord {
    /// Create a new record in the Pending state.
    pub fn new(
        fix_id: impl Into<String>,
        strategy: LandingStrategy,
        base_branch: impl Into<String>,
        files: Vec<String>,
        author: CommitAuthor,
        metadata: RecordMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            fix_id: fix_id.into(),
            strategy,
            status: CommitStatus::Pending,
            branch: String::new(),
            base_branch: base_branch.into(),
            commit_hash: None,
            pr_number: None,
            pr_url: None,
            title: String::new(),
            description: String::new(),
            files,
            author,
            timestamp: now,
            rollback_info: None,
            metadata,
            updated_at: now,
        }
    }

    /// Transition to a new state. Returns an error if the transition is invalid.
    pub fn transition(&mut self, new_status: CommitStatus) -> Result<(), LanderError> {
        if !self.status.can_transition_to(&new_status) {
            return Err(LanderError::InvalidTransition {
                record_id: self.id,
                from: self.status.to_string(),
                to: new_status.to_string(),
            });
        }
        self.status = new_status;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record the landing commit and move to Committed.
    pub fn record_commit(&mut self, commit_hash: impl Into<String>) -> Result<(), LanderError> {
        self.transition(CommitStatus::Committed)?;
        self.commit_hash = Some(commit_hash.into());
        Ok(())
    }

    /// Record the opened review and move to PrCreated.
    pub fn record_review(&mut self, number: u64, url: impl Into<String>) -> Result<(), LanderError> {
        if !self.strategy.creates_review() {
            return Err(LanderError::InvalidTransition {
                record_id: self.id,
                from: self.status.to_string(),
                to: CommitStatus::PrCreated.to_string(),
            });
        }
        self.transition(CommitStatus::PrCreated)?;
        self.pr_number = Some(number);
        self.pr_url = Some(url.into());
        Ok(())
    }

    /// Mark the review merged, optionally adopting the merge commit hash.
    pub fn record_merge(&mut self, merge_commit: Option<String>) -> Result<(), LanderError> {
        self.transition(CommitStatus::Merged)?;
        if let Some(hash) = merge_commit {
            self.commit_hash = Some(hash);
        }
        Ok(())
    }

    /// Mark the record rolled back by `rollback_commit`.
    pub fn record_rollback(
        &mut self,
        rollback_commit: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<(), LanderError> {
        let original_commit = self.commit_hash.clone().ok_or_else(|| {
            LanderError::Rollback(format!("record {} has no recorded commit", self.id))
        })?;
        self.transition(CommitStatus::RolledBack)?;
        self.rollback_info = Some(RollbackInfo {
            original_commit,
            rollback_commit: rollback_commit.into(),
            reason: reason.into(),
            rolled_back_at: Utc::now(),
        });
        Ok(())
    }

    /// Move to Failed with a reason.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), LanderError> {
        self.transition(CommitStatus::Failed {
            reason: reason.into(),
        })
    }

    /// Whether the record has an open (unmerged) remote review.
    pub fn has_open_review(&self) -> bool {
        self.pr_number.is_some() && matches!(self.status, CommitStatus::PrCreated)
    }

    /// Whether this record counts as a success for its strategy.
    pub fn is_success(&self) -> bool {
        match self.status {
            CommitStatus::Merged => true,
            CommitStatus::Committed => self.strategy == LandingStrategy::DirectCommit,
            _ => false,
        }
    }
}
