// land.rs — `lander land`: land one verified fix.

use std::path::Path;

use lander_core::{Fix, Issue, VerificationResult};

use crate::commands::print_record;
use crate::context::{read_json, LanderPaths};

pub async fn execute(
    paths: &LanderPaths,
    fix_path: &Path,
    verification_path: &Path,
    issue_path: Option<&Path>,
) -> anyhow::Result<()> {
    let fix: Fix = read_json(fix_path)?;
    let verification: VerificationResult = read_json(verification_path)?;
    let issue: Option<Issue> = issue_path.map(read_json).transpose()?;

    let orch = paths.orchestrator()?;
    let record = orch.commit_fix(fix, verification, issue).await?;

    println!("Fix landed.");
    print_record(&record);
    Ok(())
}
