// review.rs — `lander review-status` and `lander sync`.

use clap::ValueEnum;
use lander_orchestrator::PrOutcome;
use lander_submit::ReviewState;

use crate::commands::print_record;
use crate::context::{parse_id, LanderPaths};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutcomeArg {
    Merged,
    Closed,
}

pub async fn set_status(
    paths: &LanderPaths,
    id: &str,
    outcome: OutcomeArg,
    merge_commit: Option<String>,
) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let outcome = match outcome {
        OutcomeArg::Merged => PrOutcome::Merged { merge_commit },
        OutcomeArg::Closed => {
            if merge_commit.is_some() {
                anyhow::bail!("--merge-commit only applies to merged reviews");
            }
            PrOutcome::Closed
        }
    };

    let orch = paths.orchestrator()?;
    let record = orch.update_pr_status(id, outcome).await?;
    print_record(&record);
    Ok(())
}

pub async fn sync(paths: &LanderPaths, id: &str) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let orch = paths.orchestrator()?;
    let (state, record) = orch.sync_review_status(id).await?;

    match state {
        ReviewState::Open => println!("Review is still open."),
        ReviewState::Merged { merge_commit } => println!(
            "Review merged{}.",
            merge_commit
                .map(|h| format!(" as {}", h))
                .unwrap_or_default()
        ),
        ReviewState::Closed => println!("Review closed without merge."),
    }
    print_record(&record);
    Ok(())
}
