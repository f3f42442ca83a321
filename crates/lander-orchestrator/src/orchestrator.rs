//! CommitOrchestrator: drives one landing attempt per fix through the
//! record state machine and owns everything that happens afterwards
//! (rollback, review outcome, statistics, events).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use lander_core::{
    ChannelSink, CommitRecord, CommitStatus, EventDispatcher, Fix, Issue, LanderError,
    LandingEvent, LandingStrategy, NotificationSink, RecordMetadata, RecordStore, Result,
    VerificationResult,
};
use lander_submit::{
    apply_review_policy, compose_description, compose_message, select_strategy, LanderConfig,
    ReviewGateway, ReviewRequest, ReviewState, SourceControl,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::inflight::InFlight;
use crate::stats::Statistics;

/// Outcome of a remote review reported from outside the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PrOutcome {
    Merged { merge_commit: Option<String> },
    Closed,
}

/// Lands verified fixes. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct CommitOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    config: LanderConfig,
    vcs: Arc<dyn SourceControl>,
    reviews: ReviewGateway,
    store: Option<RecordStore>,
    records: Mutex<HashMap<Uuid, CommitRecord>>,
    stats: Mutex<Statistics>,
    events: EventDispatcher,
    in_flight: InFlight,
    rolling_back: Mutex<HashSet<Uuid>>,
}

/// What a landing attempt has touched so far, for cleanup.
#[derive(Default)]
struct Progress {
    feature_branch: Option<String>,
    start_head: Option<String>,
}

impl CommitOrchestrator {
    /// Validates `config` and starts with empty records and statistics.
    pub fn new(
        config: LanderConfig,
        vcs: Arc<dyn SourceControl>,
        reviews: ReviewGateway,
    ) -> Result<Self> {
        Self::build(config, vcs, reviews, None, Vec::new())
    }

    /// Like [`new`](Self::new), persisting every record change to `store`
    /// and seeding records and statistics from what it already holds.
    pub fn with_store(
        config: LanderConfig,
        vcs: Arc<dyn SourceControl>,
        reviews: ReviewGateway,
        store: RecordStore,
    ) -> Result<Self> {
        let existing = store.list()?;
        Self::build(config, vcs, reviews, Some(store), existing)
    }

    fn build(
        config: LanderConfig,
        vcs: Arc<dyn SourceControl>,
        reviews: ReviewGateway,
        store: Option<RecordStore>,
        existing: Vec<CommitRecord>,
    ) -> Result<Self> {
        config.validate()?;

        let stats = Statistics::from_records(&existing);
        let records = existing.into_iter().map(|r| (r.id, r)).collect();

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                vcs,
                reviews,
                store,
                records: Mutex::new(records),
                stats: Mutex::new(stats),
                events: EventDispatcher::new(),
                in_flight: InFlight::default(),
                rolling_back: Mutex::new(HashSet::new()),
            }),
        })
    }

    pub fn config(&self) -> &LanderConfig {
        &self.inner.config
    }

    /// Register a sink for landing events.
    pub fn add_sink(&self, sink: Box<dyn NotificationSink>) {
        self.inner.events.add_sink(sink);
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<LandingEvent> {
        let (sink, rx) = ChannelSink::channel();
        self.inner.events.add_sink(Box::new(sink));
        rx
    }

    pub fn record(&self, id: Uuid) -> Option<CommitRecord> {
        lock(&self.inner.records).get(&id).cloned()
    }

    /// All records, newest first.
    pub fn records(&self) -> Vec<CommitRecord> {
        let mut all: Vec<CommitRecord> = lock(&self.inner.records).values().cloned().collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all
    }

    pub fn statistics(&self) -> Statistics {
        lock(&self.inner.stats).clone()
    }

    /// Whether a landing attempt for `fix_id` is currently running.
    pub fn is_in_flight(&self, fix_id: &str) -> bool {
        self.inner.in_flight.contains(fix_id)
    }

    /// Land a verified fix.
    ///
    /// A call for a fix id that is already being landed awaits that attempt
    /// and returns its outcome instead of starting a second one.
    pub async fn commit_fix(
        &self,
        fix: Fix,
        verification: VerificationResult,
        issue: Option<Issue>,
    ) -> Result<CommitRecord> {
        let fix_id = fix.id.clone();
        let inner = self.inner.clone();
        let (attempt, started) = self.inner.in_flight.join_or_start(&fix_id, move || async move {
            inner.land(fix, verification, issue).await
        });
        if !started {
            tracing::info!("fix {} is already being landed; joining that attempt", fix_id);
        }
        attempt.await
    }

    /// Revert a landed change and mark its record rolled back.
    ///
    /// Direct commits and merged reviews are reverted on the base branch;
    /// anything else on its feature branch. The revert is pushed. A failed
    /// rollback leaves the record untouched.
    pub async fn rollback_commit(&self, id: Uuid, reason: &str) -> Result<CommitRecord> {
        let inner = &self.inner;
        if !inner.config.rollback.enabled {
            return Err(LanderError::Configuration(
                "rollback is disabled in configuration".to_string(),
            ));
        }

        let _claim = RollbackClaim::acquire(&inner.rolling_back, id)?;
        let record = self.record(id).ok_or(LanderError::NotFound(id))?;

        if record.status == CommitStatus::RolledBack {
            return Err(LanderError::Rollback(format!(
                "record {} is already rolled back",
                id
            )));
        }
        let original = record.commit_hash.clone().ok_or_else(|| {
            LanderError::Rollback(format!("record {} has no recorded commit", id))
        })?;
        if !record.status.can_transition_to(&CommitStatus::RolledBack) {
            return Err(LanderError::Rollback(format!(
                "cannot roll back record {} in state {}",
                id, record.status
            )));
        }

        let on_base =
            record.strategy == LandingStrategy::DirectCommit || record.status == CommitStatus::Merged;
        let target = if on_base {
            record.base_branch.clone()
        } else {
            record.branch.clone()
        };
        tracing::info!(
            "rolling back record {} ({}) on {}",
            id,
            short(&original),
            target
        );

        // The placement and the commit to revert were decided from this
        // snapshot; any change to either invalidates the revert.
        let unchanged = |r: &CommitRecord| {
            r.status == record.status && r.commit_hash == record.commit_hash
        };
        let changed = || {
            LanderError::Rollback(format!("record {} changed while being rolled back", id))
        };

        inner.vcs.switch_to(&target).await?;
        let before_revert = inner.vcs.head().await?;
        let revert_hash = inner.vcs.revert(&original).await?;
        if !self.record(id).is_some_and(|r| unchanged(&r)) {
            inner.drop_revert(&target, &before_revert).await;
            return Err(changed());
        }
        if let Err(e) = inner.vcs.push(Some(&target)).await {
            inner.drop_revert(&target, &before_revert).await;
            return Err(e);
        }

        let was_success = record.is_success();
        let (open_review, updated) = inner.update(id, |r| {
            if !unchanged(&*r) {
                return Err(changed());
            }
            let open_review = if r.has_open_review() { r.pr_number } else { None };
            r.record_rollback(revert_hash.clone(), reason)?;
            Ok(open_review)
        })?;

        if let Some(number) = open_review {
            let comment = format!("Rolled back: {}", reason);
            if let Err(e) = inner.reviews.close_review(number, &comment).await {
                tracing::warn!("could not close review #{} after rollback: {}", number, e);
            }
        }

        if !inner.config.rollback.keep_rollback_branch && updated.branch != updated.base_branch {
            inner.vcs.delete_branch(&updated.branch).await;
        }

        lock(&inner.stats).rolled_back(updated.strategy, was_success);
        inner
            .events
            .dispatch(&LandingEvent::commit_rolled_back(&updated));
        tracing::info!(
            "record {} rolled back by {}",
            id,
            short(&revert_hash)
        );
        Ok(updated)
    }

    /// Apply a review outcome reported by the hosting provider.
    ///
    /// Both outcomes require the record to be in `pr_created` and no
    /// rollback of it in progress. A closed review leaves the status
    /// unchanged.
    pub async fn update_pr_status(&self, id: Uuid, outcome: PrOutcome) -> Result<CommitRecord> {
        let inner = &self.inner;
        match outcome {
            PrOutcome::Merged { merge_commit } => {
                let (_, updated) = {
                    // No rollback claim can be taken while this is held.
                    let rolling_back = lock(&inner.rolling_back);
                    if rolling_back.contains(&id) {
                        return Err(rollback_in_progress(id));
                    }
                    inner.update(id, |r| r.record_merge(merge_commit))?
                };

                if inner.config.review.delete_branch_after_merge
                    && updated.branch != updated.base_branch
                {
                    inner.vcs.delete_branch(&updated.branch).await;
                }

                lock(&inner.stats).review_merged(updated.strategy);
                inner.events.dispatch(&LandingEvent::pr_merged(&updated));
                tracing::info!("record {} merged", id);
                Ok(updated)
            }
            PrOutcome::Closed => {
                if lock(&inner.rolling_back).contains(&id) {
                    return Err(rollback_in_progress(id));
                }
                let record = self.record(id).ok_or(LanderError::NotFound(id))?;
                if record.status != CommitStatus::PrCreated {
                    return Err(LanderError::InvalidTransition {
                        record_id: id,
                        from: record.status.to_string(),
                        to: "closed".to_string(),
                    });
                }
                inner.events.dispatch(&LandingEvent::pr_closed(&record));
                tracing::info!("review for record {} closed without merge", id);
                Ok(record)
            }
        }
    }

    /// Ask the provider where the record's review stands and apply any
    /// merge or close it reports.
    pub async fn sync_review_status(&self, id: Uuid) -> Result<(ReviewState, CommitRecord)> {
        let record = self.record(id).ok_or(LanderError::NotFound(id))?;
        let number = record.pr_number.ok_or_else(|| {
            LanderError::Review(format!("record {} has no remote review", id))
        })?;
        if record.status != CommitStatus::PrCreated {
            let state = self.inner.reviews.review_state(number).await?;
            return Ok((state, record));
        }

        let state = self.inner.reviews.review_state(number).await?;
        let record = match &state {
            ReviewState::Open => record,
            ReviewState::Merged { merge_commit } => {
                self.update_pr_status(
                    id,
                    PrOutcome::Merged {
                        merge_commit: merge_commit.clone(),
                    },
                )
                .await?
            }
            ReviewState::Closed => self.update_pr_status(id, PrOutcome::Closed).await?,
        };
        Ok((state, record))
    }
}

impl Inner {
    async fn land(
        &self,
        fix: Fix,
        verification: VerificationResult,
        issue: Option<Issue>,
    ) -> Result<CommitRecord> {
        if !self.config.enabled {
            return Err(LanderError::Configuration(
                "landing pipeline is disabled".to_string(),
            ));
        }
        self.validate_fix(&fix)?;

        let selected = select_strategy(&fix, &verification, self.config.default_strategy);
        let strategy = apply_review_policy(selected, &self.config.review);
        if strategy != selected {
            tracing::info!(
                "fix {}: review settings turn {} into {}",
                fix.id,
                selected,
                strategy
            );
        }

        let metadata = RecordMetadata {
            issue_id: issue.as_ref().map(|i| i.id.clone()),
            verification_score: verification.overall_score,
            auto_approved: !verification.approval_required,
            auto_merge_eligible: strategy.creates_review()
                && self.config.review.auto_merge
                && !verification.approval_required
                && verification.overall_score >= self.config.review.auto_merge_score_threshold,
        };
        let mut record = CommitRecord::new(
            fix.id.clone(),
            strategy,
            self.vcs.base_branch(),
            fix.touched_files(),
            self.config.git.author(),
            metadata,
        );
        self.save(&record);
        record.transition(CommitStatus::Preparing)?;
        self.save(&record);
        lock(&self.stats).attempt_started(strategy);

        tracing::info!(
            "landing fix {} as {} (record {})",
            fix.id,
            strategy,
            record.id
        );

        let mut progress = Progress::default();
        match self
            .run_steps(&mut record, &mut progress, &fix, &verification, issue.as_ref())
            .await
        {
            Ok(()) => {
                self.save(&record);
                lock(&self.stats).attempt_finished(&record);
                self.events
                    .dispatch(&LandingEvent::commit_completed(&record));
                tracing::info!(
                    "fix {} landed: record {} is {}",
                    fix.id,
                    record.id,
                    record.status
                );
                Ok(record)
            }
            Err(err) => {
                tracing::warn!("landing fix {} failed: {}", fix.id, err);
                if let Err(e) = record.fail(err.to_string()) {
                    tracing::warn!("record {} could not be marked failed: {}", record.id, e);
                }
                self.save(&record);
                lock(&self.stats).attempt_failed();
                self.clean_up(&progress).await;
                Err(err)
            }
        }
    }

    fn validate_fix(&self, fix: &Fix) -> Result<()> {
        if fix.actions.is_empty() {
            return Err(LanderError::InvalidFix(format!(
                "fix {} has no file actions",
                fix.id
            )));
        }
        if self.config.commit.require_description && fix.description.trim().is_empty() {
            return Err(LanderError::InvalidFix(format!(
                "fix {} has no description",
                fix.id
            )));
        }
        Ok(())
    }

    /// Branch, apply, commit, push, and open a review, strictly in order.
    async fn run_steps(
        &self,
        record: &mut CommitRecord,
        progress: &mut Progress,
        fix: &Fix,
        verification: &VerificationResult,
        issue: Option<&Issue>,
    ) -> Result<()> {
        if record.strategy == LandingStrategy::DirectCommit {
            self.vcs.checkout_base().await?;
            record.branch = record.base_branch.clone();
        } else {
            let branch = self.vcs.create_branch(fix, issue).await?;
            progress.feature_branch = Some(branch.clone());
            record.branch = branch;
        }
        self.save(record);
        progress.start_head = Some(self.vcs.head().await?);

        record.files = self.vcs.apply_changes(fix).await?;

        let message = compose_message(fix, verification, issue, &self.config.commit);
        record.title = message.header(self.config.commit.use_conventional_format);
        record.description = compose_description(fix, verification, issue);

        let hash = self.vcs.create_commit(&message).await?;
        record.record_commit(hash)?;
        self.save(record);

        match record.strategy {
            LandingStrategy::DirectCommit => {
                self.vcs.push(None).await?;
            }
            LandingStrategy::BranchOnly => {
                self.vcs.push(Some(&record.branch)).await?;
            }
            LandingStrategy::PullRequest | LandingStrategy::DraftPullRequest => {
                self.vcs.push(Some(&record.branch)).await?;
                let request = ReviewRequest {
                    branch: record.branch.clone(),
                    base_branch: record.base_branch.clone(),
                    title: record.title.clone(),
                    description: record.description.clone(),
                    draft: record.strategy == LandingStrategy::DraftPullRequest,
                    reviewers: self.config.review.default_reviewers.clone(),
                    labels: self.config.review.default_labels.clone(),
                };
                let handle = self.reviews.create_review(&request).await?;
                record.record_review(handle.id, handle.url)?;
            }
        }
        Ok(())
    }

    /// Reset `branch` back over a revert that was never pushed.
    async fn drop_revert(&self, branch: &str, before_revert: &str) {
        if let Err(e) = self.vcs.reset_hard(before_revert).await {
            tracing::warn!("could not drop unpushed revert on {}: {}", branch, e);
        }
    }

    /// Best-effort undo of a failed attempt. Never fails.
    ///
    /// Opening the review is the last step, so a failed attempt never leaves
    /// a review behind.
    async fn clean_up(&self, progress: &Progress) {
        if self.config.rollback.auto_rollback_on_failure {
            if let Some(head) = &progress.start_head {
                if let Err(e) = self.vcs.reset_hard(head).await {
                    tracing::warn!("cleanup: could not reset to {}: {}", short(head), e);
                }
            }
        }

        if let Some(branch) = &progress.feature_branch {
            if branch != self.vcs.base_branch() {
                self.vcs.delete_branch(branch).await;
            }
        }
    }

    /// Apply `change` to a copy of the record; commit and persist it only
    /// if the change succeeds.
    fn update<T>(
        &self,
        id: Uuid,
        change: impl FnOnce(&mut CommitRecord) -> Result<T>,
    ) -> Result<(T, CommitRecord)> {
        let updated = {
            let mut records = lock(&self.records);
            let current = records.get(&id).ok_or(LanderError::NotFound(id))?;
            let mut copy = current.clone();
            let out = change(&mut copy)?;
            records.insert(id, copy.clone());
            (out, copy)
        };
        self.persist(&updated.1);
        Ok(updated)
    }

    /// Publish the latest state of a record being landed.
    fn save(&self, record: &CommitRecord) {
        lock(&self.records).insert(record.id, record.clone());
        self.persist(record);
    }

    fn persist(&self, record: &CommitRecord) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(record) {
                tracing::warn!("could not persist record {}: {}", record.id, e);
            }
        }
    }
}

/// Marks a record as being rolled back for the claim's lifetime.
struct RollbackClaim<'a> {
    set: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl<'a> RollbackClaim<'a> {
    fn acquire(set: &'a Mutex<HashSet<Uuid>>, id: Uuid) -> Result<Self> {
        if !lock(set).insert(id) {
            return Err(rollback_in_progress(id));
        }
        Ok(Self { set, id })
    }
}

fn rollback_in_progress(id: Uuid) -> LanderError {
    LanderError::Rollback(format!("rollback of record {} already in progress", id))
}

impl Drop for RollbackClaim<'_> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}
