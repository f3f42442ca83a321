//! # lander-core
//!
//! Commit records, landing contracts, and event dispatch for the automated
//! fix landing pipeline.
//!
//! A [`CommitRecord`] tracks one attempt to land an already-verified fix in
//! version control. The state machine enforces a valid lifecycle from
//! creation through commit, review, merge, or rollback.
//!
//! ## Key components
//!
//! - [`Fix`], [`Issue`], [`VerificationResult`] — upstream data contracts
//! - [`CommitRecord`] — the lifecycle state machine (Pending → Preparing →
//!   Committed → PrCreated → Merged, with Failed and RolledBack exits)
//! - [`RecordStore`] — JSON file-based persistence for records
//! - [`LandingEvent`] — events published at the end of each outcome
//! - [`EventDispatcher`] — fans events out to [`NotificationSink`]s

pub mod contracts;
pub mod error;
pub mod events;
pub mod record;
pub mod store;

pub use contracts::{EstimatedImpact, Fix, FixAction, Issue, TestSummary, VerificationResult};
pub use error::{LanderError, Result};
pub use events::{ChannelSink, EventDispatcher, LandingEvent, LogSink, NotificationSink};
pub use record::{
    CommitAuthor, CommitRecord, CommitStatus, LandingStrategy, RecordMetadata, RollbackInfo,
};
pub use store::RecordStore;
