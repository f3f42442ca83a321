// context.rs — Project paths and orchestrator wiring for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use lander_core::{LogSink, RecordStore};
use lander_orchestrator::CommitOrchestrator;
use lander_submit::{GitDriver, LanderConfig, ReviewGateway};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Where the CLI keeps its state inside a repository.
pub struct LanderPaths {
    pub project_root: PathBuf,
    pub config_file: PathBuf,
    pub records_dir: PathBuf,
    pub events_file: PathBuf,
}

impl LanderPaths {
    pub fn for_project(project_root: &Path) -> Self {
        let dir = project_root.join(".lander");
        Self {
            project_root: project_root.to_path_buf(),
            config_file: dir.join("config.toml"),
            records_dir: dir.join("records"),
            events_file: dir.join("events.jsonl"),
        }
    }

    /// `.lander/config.toml` if present, defaults otherwise.
    pub fn load_config(&self) -> anyhow::Result<LanderConfig> {
        if self.config_file.exists() {
            Ok(LanderConfig::load(&self.config_file)?)
        } else {
            tracing::info!(
                "no {} found, using default settings",
                self.config_file.display()
            );
            Ok(LanderConfig::default())
        }
    }

    pub fn store(&self) -> anyhow::Result<RecordStore> {
        RecordStore::new(&self.records_dir)
            .with_context(|| format!("opening record store {}", self.records_dir.display()))
    }

    /// Orchestrator over the project's working copy, persisting records and
    /// appending events to `.lander/events.jsonl`.
    pub fn orchestrator(&self) -> anyhow::Result<CommitOrchestrator> {
        let config = self.load_config()?;
        let driver = GitDriver::new(&self.project_root, &config);
        let reviews = ReviewGateway::from_config(&config, &self.project_root)
            .context("configuring review provider")?;
        let orch = CommitOrchestrator::with_store(config, Arc::new(driver), reviews, self.store()?)
            .context("invalid pipeline configuration")?;
        orch.add_sink(Box::new(LogSink::new(&self.events_file)));
        Ok(orch)
    }
}

pub fn parse_id(id: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("invalid record ID: {}", id))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
