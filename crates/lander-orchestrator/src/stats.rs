//! Landing statistics owned by one orchestrator instance.

use std::collections::HashMap;

use lander_core::{CommitRecord, CommitStatus, LandingStrategy};
use serde::{Deserialize, Serialize};

/// Per-strategy attempt and success counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrategyStats {
    pub attempts: u64,
    pub successes: u64,
}

impl StrategyStats {
    /// Successes over attempts; 0.0 before the first attempt.
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }
}

/// Aggregate counters across every landing attempt.
///
/// A success is a merged record, or a committed one for direct commits.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    pub total_attempts: u64,
    pub reviews_created: u64,
    pub merged: u64,
    pub rolled_back: u64,
    pub failed: u64,
    pub by_strategy: HashMap<LandingStrategy, StrategyStats>,
}

impl Statistics {
    /// Rebuild counters from the current state of persisted records.
    pub fn from_records(records: &[CommitRecord]) -> Self {
        let mut stats = Statistics::default();
        for record in records {
            stats.total_attempts += 1;
            if record.pr_number.is_some() {
                stats.reviews_created += 1;
            }
            match record.status {
                CommitStatus::Merged => stats.merged += 1,
                CommitStatus::RolledBack => stats.rolled_back += 1,
                CommitStatus::Failed { .. } => stats.failed += 1,
                _ => {}
            }
            let entry = stats.by_strategy.entry(record.strategy).or_default();
            entry.attempts += 1;
            if record.is_success() {
                entry.successes += 1;
            }
        }
        stats
    }

    pub fn strategy(&self, strategy: LandingStrategy) -> StrategyStats {
        self.by_strategy.get(&strategy).copied().unwrap_or_default()
    }

    pub(crate) fn attempt_started(&mut self, strategy: LandingStrategy) {
        self.total_attempts += 1;
        self.by_strategy.entry(strategy).or_default().attempts += 1;
    }

    pub(crate) fn attempt_finished(&mut self, record: &CommitRecord) {
        if record.pr_number.is_some() {
            self.reviews_created += 1;
        }
        if record.is_success() {
            self.by_strategy.entry(record.strategy).or_default().successes += 1;
        }
    }

    pub(crate) fn attempt_failed(&mut self) {
        self.failed += 1;
    }

    pub(crate) fn review_merged(&mut self, strategy: LandingStrategy) {
        self.merged += 1;
        self.by_strategy.entry(strategy).or_default().successes += 1;
    }

    /// `was_success` is the record's standing before the revert.
    pub(crate) fn rolled_back(&mut self, strategy: LandingStrategy, was_success: bool) {
        self.rolled_back += 1;
        if was_success {
            let entry = self.by_strategy.entry(strategy).or_default();
            entry.successes = entry.successes.saturating_sub(1);
        }
    }
}
