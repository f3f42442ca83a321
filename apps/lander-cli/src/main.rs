//! # lander-cli
//!
//! Command-line interface for the fix landing pipeline.
//!
//! - `lander land` — land a verified fix from JSON inputs
//! - `lander rollback` — revert a landed fix
//! - `lander review-status` / `lander sync` — apply review outcomes
//! - `lander records list/show` — inspect commit records
//! - `lander stats` — landing statistics

mod commands;
mod context;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use context::LanderPaths;

/// Land verified fixes in version control.
#[derive(Parser)]
#[command(name = "lander", version, about)]
struct Cli {
    /// Repository root (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Log output format on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Land a verified fix.
    Land {
        /// Fix JSON document.
        #[arg(long)]
        fix: PathBuf,
        /// Verification result JSON document.
        #[arg(long)]
        verification: PathBuf,
        /// Optional issue JSON document.
        #[arg(long)]
        issue: Option<PathBuf>,
    },
    /// Revert a landed fix.
    Rollback {
        /// Commit record ID.
        id: String,
        /// Why the change is being reverted.
        #[arg(long)]
        reason: String,
    },
    /// Record a review outcome reported by the hosting provider.
    ReviewStatus {
        /// Commit record ID.
        id: String,
        /// What happened to the review.
        #[arg(value_enum)]
        outcome: commands::review::OutcomeArg,
        /// Merge commit hash, when merged.
        #[arg(long)]
        merge_commit: Option<String>,
    },
    /// Ask the provider for the review's state and apply it.
    Sync {
        /// Commit record ID.
        id: String,
    },
    /// Inspect commit records.
    Records {
        #[command(subcommand)]
        command: commands::records::RecordsCommands,
    },
    /// Show landing statistics.
    Stats,
}

/// `RUST_LOG` plus info for every crate of the pipeline.
fn log_filter() -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("lander=info".parse()?)
        .add_directive("lander_core=info".parse()?)
        .add_directive("lander_orchestrator=info".parse()?)
        .add_directive("lander_submit=info".parse()?))
}

fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    let filter = log_filter()?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let paths = LanderPaths::for_project(&project_root);

    match &cli.command {
        Commands::Land {
            fix,
            verification,
            issue,
        } => commands::land::execute(&paths, fix, verification, issue.as_deref()).await,
        Commands::Rollback { id, reason } => commands::rollback::execute(&paths, id, reason).await,
        Commands::ReviewStatus {
            id,
            outcome,
            merge_commit,
        } => commands::review::set_status(&paths, id, *outcome, merge_commit.clone()).await,
        Commands::Sync { id } => commands::review::sync(&paths, id).await,
        Commands::Records { command } => commands::records::execute(command, &paths),
        Commands::Stats => commands::stats::execute(&paths),
    }
}
