//! Landing strategy selection from risk and verification signals

use lander_core::{Fix, LandingStrategy, VerificationResult};

use crate::config::ReviewSettings;

/// Minimum verification score for a direct commit.
pub const DIRECT_COMMIT_MIN_SCORE: f64 = 0.95;

/// Maximum risk score for a direct commit (exclusive).
pub const DIRECT_COMMIT_MAX_RISK: f64 = 0.2;

/// Below this verification score a fix only ever lands as a draft.
pub const DRAFT_SCORE_CEILING: f64 = 0.7;

/// Above this risk score a fix only ever lands as a draft.
pub const DRAFT_RISK_FLOOR: f64 = 0.8;

/// Pick how a verified fix should land. First matching rule wins:
///
/// 1. direct commit: score ≥ 0.95, no approval required, risk < 0.2, one file
/// 2. draft review: score < 0.7 or risk > 0.8
/// 3. the configured default
pub fn select_strategy(
    fix: &Fix,
    verification: &VerificationResult,
    default_strategy: LandingStrategy,
) -> LandingStrategy {
    let impact = &fix.estimated_impact;

    if verification.overall_score >= DIRECT_COMMIT_MIN_SCORE
        && !verification.approval_required
        && impact.risk_score < DIRECT_COMMIT_MAX_RISK
        && impact.files_changed == 1
    {
        return LandingStrategy::DirectCommit;
    }

    if verification.overall_score < DRAFT_SCORE_CEILING || impact.risk_score > DRAFT_RISK_FLOOR {
        return LandingStrategy::DraftPullRequest;
    }

    default_strategy
}

/// Adjust a selected strategy to what the review settings permit.
///
/// A mandatory review rules out direct commits; with reviews switched off
/// the branch is still pushed but no review is opened.
pub fn apply_review_policy(strategy: LandingStrategy, review: &ReviewSettings) -> LandingStrategy {
    match strategy {
        LandingStrategy::DirectCommit if review.require_review => {
            if review.enabled {
                LandingStrategy::PullRequest
            } else {
                LandingStrategy::BranchOnly
            }
        }
        LandingStrategy::PullRequest | LandingStrategy::DraftPullRequest if !review.enabled => {
            LandingStrategy::BranchOnly
        }
        other => other,
    }
}
