//! In-flight landing attempts keyed by fix id.
//!
//! At most one attempt runs per fix id. Each attempt runs as its own tokio
//! task, so it finishes its git sequence even if every caller goes away. A
//! second caller gets a clone of the same shared handle and observes the
//! same outcome. The entry is removed when the task ends, on every path.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use lander_core::{CommitRecord, LanderError, Result};

pub(crate) type Attempt = Shared<BoxFuture<'static, Result<CommitRecord>>>;

struct Entry {
    attempt_id: u64,
    attempt: Attempt,
}

#[derive(Default)]
pub(crate) struct InFlight {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    next_id: AtomicU64,
}

/// Removes its entry on drop, but only if the slot still belongs to the
/// attempt that created it.
struct RemoveOnDrop {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    fix_id: String,
    attempt_id: u64,
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        let mut entries = lock(&self.entries);
        if entries
            .get(&self.fix_id)
            .is_some_and(|e| e.attempt_id == self.attempt_id)
        {
            entries.remove(&self.fix_id);
            tracing::debug!("in-flight attempt for fix {} cleared", self.fix_id);
        }
    }
}

impl InFlight {
    /// Join the running attempt for `fix_id`, or start one from `start`.
    ///
    /// `start` is only called when no attempt is in flight. Must be called
    /// from within a tokio runtime.
    pub(crate) fn join_or_start<F, Fut>(&self, fix_id: &str, start: F) -> (Attempt, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CommitRecord>> + Send + 'static,
    {
        let mut entries = lock(&self.entries);
        if let Some(entry) = entries.get(fix_id) {
            return (entry.attempt.clone(), false);
        }

        let attempt_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = RemoveOnDrop {
            entries: self.entries.clone(),
            fix_id: fix_id.to_string(),
            attempt_id,
        };
        let work = start();
        let task = tokio::spawn(async move {
            let _guard = guard;
            work.await
        });
        let attempt = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(LanderError::Aborted(e.to_string())),
            }
        }
        .boxed()
        .shared();

        entries.insert(
            fix_id.to_string(),
            Entry {
                attempt_id,
                attempt: attempt.clone(),
            },
        );
        (attempt, true)
    }

    pub(crate) fn contains(&self, fix_id: &str) -> bool {
        lock(&self.entries).contains_key(fix_id)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
