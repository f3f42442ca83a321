//! Version control and review plumbing for landing verified fixes
//!
//! This crate turns a fix into git operations and remote reviews. The core
//! abstractions are the [`SourceControl`] trait (with the [`GitDriver`]
//! implementation shelling out to `git`) and the [`ReviewGateway`], bound to
//! one [`ReviewProvider`] chosen from configuration.

pub mod config;
pub mod git;
pub mod message;
pub mod path_policy;
pub mod review;
pub mod strategy;

pub use config::{
    CommitSettings, GitSettings, LanderConfig, ProviderConfig, ReviewSettings, RollbackSettings,
    SecuritySettings,
};
pub use git::{GitDriver, SourceControl};
pub use message::{compose_description, compose_message, CommitMessage};
pub use review::{
    ReviewGateway, ReviewHandle, ReviewProvider, ReviewRequest, ReviewState,
};
pub use strategy::{apply_review_policy, select_strategy};
