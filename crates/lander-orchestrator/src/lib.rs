//! # lander-orchestrator
//!
//! Drives verified fixes into version control.
//!
//! [`CommitOrchestrator::commit_fix`] picks a landing strategy, then runs
//! branch → apply → commit → push → review strictly in order, moving the
//! [`CommitRecord`](lander_core::CommitRecord) through its state machine.
//! Concurrent requests for the same fix share one attempt. Failures are
//! cleaned up best-effort and re-raised unchanged.
//!
//! After landing, the orchestrator handles rollback, review outcomes
//! reported by the hosting provider, statistics, and event publication.

mod inflight;
pub mod orchestrator;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{CommitOrchestrator, PrOutcome};
pub use stats::{Statistics, StrategyStats};
