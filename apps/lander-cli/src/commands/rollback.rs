// rollback.rs — `lander rollback`: revert a landed fix.

use crate::commands::print_record;
use crate::context::{parse_id, LanderPaths};

pub async fn execute(paths: &LanderPaths, id: &str, reason: &str) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let orch = paths.orchestrator()?;
    let record = orch.rollback_commit(id, reason).await?;

    println!("Rolled back.");
    print_record(&record);
    Ok(())
}
