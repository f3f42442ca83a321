// records.rs — `lander records`: list and inspect commit records.

use clap::Subcommand;
use lander_core::{CommitRecord, RecordStore};

use crate::commands::print_record;
use crate::context::{parse_id, LanderPaths};

#[derive(Subcommand)]
pub enum RecordsCommands {
    /// List commit records, newest first.
    List {
        /// Only records for this fix ID.
        #[arg(long)]
        fix: Option<String>,
        /// Filter by status (e.g., "pr_created", "failed").
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one record.
    Show {
        /// Commit record ID.
        id: String,
        /// Print the raw JSON record.
        #[arg(long)]
        json: bool,
    },
}

pub fn execute(cmd: &RecordsCommands, paths: &LanderPaths) -> anyhow::Result<()> {
    let store = paths.store()?;
    match cmd {
        RecordsCommands::List { fix, status } => list(&store, fix.as_deref(), status.as_deref()),
        RecordsCommands::Show { id, json } => show(&store, id, *json),
    }
}

fn filter(records: Vec<CommitRecord>, status: Option<&str>) -> Vec<CommitRecord> {
    match status {
        Some(s) => records
            .into_iter()
            .filter(|r| r.status.to_string() == s)
            .collect(),
        None => records,
    }
}

fn list(store: &RecordStore, fix: Option<&str>, status: Option<&str>) -> anyhow::Result<()> {
    let records = match fix {
        Some(fix_id) => store.list_for_fix(fix_id)?,
        None => store.list()?,
    };
    let records = filter(records, status);

    if records.is_empty() {
        println!("No commit records.");
        return Ok(());
    }

    println!(
        "{:<38} {:<20} {:<20} {:<12} FIX",
        "ID", "STRATEGY", "STATUS", "COMMIT"
    );
    for r in &records {
        let commit = r
            .commit_hash
            .as_deref()
            .map(|h| &h[..h.len().min(10)])
            .unwrap_or("-");
        println!(
            "{:<38} {:<20} {:<20} {:<12} {}",
            r.id,
            r.strategy.to_string(),
            r.status.to_string(),
            commit,
            r.fix_id
        );
    }
    println!("\n{} record(s)", records.len());
    Ok(())
}

fn show(store: &RecordStore, id: &str, json: bool) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let record = store
        .get(id)?
        .ok_or_else(|| anyhow::anyhow!("commit record not found: {}", id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_record(&record);
        println!("  Author:   {} <{}>", record.author.name, record.author.email);
        println!("  Files:    {}", record.files.join(", "));
        println!(
            "  Score:    {:.2}{}",
            record.metadata.verification_score,
            if record.metadata.auto_merge_eligible {
                " (auto-merge eligible)"
            } else {
                ""
            }
        );
        println!("  Created:  {}", record.timestamp.to_rfc3339());
        println!("  Updated:  {}", record.updated_at.to_rfc3339());
    }
    Ok(())
}
