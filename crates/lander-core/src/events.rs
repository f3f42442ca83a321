// events.rs — Landing events and notification dispatch.
//
// The orchestrator publishes one event per externally interesting outcome.
// Sinks (JSONL log, in-process channels, future webhooks) subscribe by
// registering with the dispatcher; the orchestrator never knows who listens.
//
// Delivery is fire-and-forget: a failing sink is logged and skipped.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::LanderError;
use crate::record::CommitRecord;

/// Events emitted at the end of each landing-pipeline outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LandingEvent {
    /// A landing attempt finished successfully.
    CommitCompleted { record: Box<CommitRecord> },

    /// A landed change was reverted.
    CommitRolledBack { record: Box<CommitRecord> },

    /// A remote review was merged.
    PrMerged { record: Box<CommitRecord> },

    /// A remote review was closed without merging.
    PrClosed { record: Box<CommitRecord> },
}

impl LandingEvent {
    /// Get the event type name as a string.
    pub fn event_type(&self) -> &str {
        match self {
            LandingEvent::CommitCompleted { .. } => "commit_completed",
            LandingEvent::CommitRolledBack { .. } => "commit_rolled_back",
            LandingEvent::PrMerged { .. } => "pr_merged",
            LandingEvent::PrClosed { .. } => "pr_closed",
        }
    }

    /// The record snapshot carried by the event.
    pub fn record(&self) -> &CommitRecord {
        match self {
            LandingEvent::CommitCompleted { record }
            | LandingEvent::CommitRolledBack { record }
            | LandingEvent::PrMerged { record }
            | LandingEvent::PrClosed { record } => record,
        }
    }

    pub fn commit_completed(record: &CommitRecord) -> Self {
        LandingEvent::CommitCompleted {
            record: Box::new(record.clone()),
        }
    }

    pub fn commit_rolled_back(record: &CommitRecord) -> Self {
        LandingEvent::CommitRolledBack {
            record: Box::new(record.clone()),
        }
    }

    pub fn pr_merged(record: &CommitRecord) -> Self {
        LandingEvent::PrMerged {
            record: Box::new(record.clone()),
        }
    }

    pub fn pr_closed(record: &CommitRecord) -> Self {
        LandingEvent::PrClosed {
            record: Box::new(record.clone()),
        }
    }
}

/// Trait for receiving landing events.
///
/// Implementations decide what to do with each event: append to a log,
/// forward to a channel, call a webhook, etc.
pub trait NotificationSink: Send + Sync {
    /// Handle an event. Errors are logged but don't stop the pipeline.
    fn send(&self, event: &LandingEvent) -> Result<(), LanderError>;
}

/// Logs events as JSONL to a file.
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl NotificationSink for LogSink {
    fn send(&self, event: &LandingEvent) -> Result<(), LanderError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| LanderError::io(parent.display(), e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LanderError::io(self.path.display(), e))?;

        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json).map_err(|e| LanderError::io(self.path.display(), e))?;

        Ok(())
    }
}

/// Forwards events to an in-process subscriber.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<LandingEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver that observes it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LandingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn send(&self, event: &LandingEvent) -> Result<(), LanderError> {
        self.tx
            .send(event.clone())
            .map_err(|_| LanderError::Io {
                path: "channel".to_string(),
                message: "subscriber dropped".to_string(),
            })
    }
}

/// Dispatches events to every registered sink.
///
/// Sinks can be registered at any time, including while landings are in
/// flight. Errors from one sink never prevent delivery to the others.
pub struct EventDispatcher {
    sinks: RwLock<Vec<Box<dyn NotificationSink>>>,
}

impl EventDispatcher {
    /// Create a new dispatcher with no sinks.
    pub fn new() -> Self {
        Self {
            sinks: RwLock::new(Vec::new()),
        }
    }

    /// Add a notification sink.
    pub fn add_sink(&self, sink: Box<dyn NotificationSink>) {
        let mut sinks = self.sinks.write().unwrap_or_else(|e| e.into_inner());
        sinks.push(sink);
    }

    /// Dispatch an event to all sinks.
    pub fn dispatch(&self, event: &LandingEvent) {
        let sinks = self.sinks.read().unwrap_or_else(|e| e.into_inner());
        for sink in sinks.iter() {
            if let Err(e) = sink.send(event) {
                tracing::warn!(event = event.event_type(), "notification sink error: {}", e);
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CommitAuthor, LandingStrategy, RecordMetadata};
    use tempfile::tempdir;

    fn sample_record() -> CommitRecord {
        CommitRecord::new(
            "fix-1",
            LandingStrategy::PullRequest,
            "main",
            vec!["src/lib.rs".to_string()],
            CommitAuthor {
                name: "Bot".to_string(),
                email: "bot@example.com".to_string(),
            },
            RecordMetadata::default(),
        )
    }

    #[test]
    fn event_serialization_is_tagged() {
        let event = LandingEvent::pr_merged(&sample_record());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"pr_merged\""));
        let restored: LandingEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.event_type(), "pr_merged");
        assert_eq!(restored.record().fix_id, "fix-1");
    }

    #[test]
    fn log_sink_appends_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("events.jsonl");
        let sink = LogSink::new(&path);

        sink.send(&LandingEvent::commit_completed(&sample_record()))
            .unwrap();
        sink.send(&LandingEvent::pr_closed(&sample_record())).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("pr_closed"));
    }

    #[test]
    fn dispatcher_reaches_every_sink_despite_failures() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let dispatcher = EventDispatcher::new();
        let (dropped, rx) = ChannelSink::channel();
        drop(rx);
        dispatcher.add_sink(Box::new(dropped));
        let (live, mut live_rx) = ChannelSink::channel();
        dispatcher.add_sink(Box::new(live));
        dispatcher.add_sink(Box::new(LogSink::new(&path)));

        dispatcher.dispatch(&LandingEvent::commit_rolled_back(&sample_record()));

        let received = live_rx.try_recv().unwrap();
        assert_eq!(received.event_type(), "commit_rolled_back");
        assert!(fs::read_to_string(&path)
            .unwrap()
            .contains("commit_rolled_back"));
    }
}
