//! Background eviction of terminal workflows.
//!
//! Runs the store's retention policy on a fixed interval until stopped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::workflow_store::WorkflowStore;

/// Handle to control a running sweeper.
pub struct SweeperHandle {
    stop_flag: Arc<AtomicBool>,
    evicted_total: Arc<AtomicU64>,
    runs: Arc<AtomicU64>,
    interval: Duration,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Request the sweeper to stop and wait for it to exit.
    pub async fn stop(self) {
        self.stop_flag.store(true, Ordering::Release);
        self.task.abort();
        let _ = self.task.await;
    }

    /// Workflows evicted since the sweeper started.
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total.load(Ordering::Acquire)
    }

    /// Time between sweeps.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Completed sweep runs.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Acquire)
    }
}

/// Periodic retention sweeper.
pub struct RetentionSweeper {
    store: WorkflowStore,
    every: Duration,
}

impl RetentionSweeper {
    pub fn new(store: WorkflowStore, every: Duration) -> Self {
        Self { store, every }
    }

    /// Spawn the sweep loop onto the current runtime.
    pub fn spawn(self) -> SweeperHandle {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let evicted_total = Arc::new(AtomicU64::new(0));
        let runs = Arc::new(AtomicU64::new(0));

        let stop = stop_flag.clone();
        let evicted = evicted_total.clone();
        let run_count = runs.clone();
        let store = self.store;
        let every = self.every;

        let task = tokio::spawn(async move {
            info!(interval_secs = every.as_secs(), "Retention sweeper started");
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if stop.load(Ordering::Acquire) {
                    break;
                }
                let removed = store.evict_terminal(Utc::now()).await;
                evicted.fetch_add(removed as u64, Ordering::AcqRel);
                run_count.fetch_add(1, Ordering::AcqRel);
                debug!(removed, "Retention sweep finished");
            }
        });

        SweeperHandle {
            stop_flag,
            evicted_total,
            runs,
            interval: every,
            task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{OrchestratorTask, WorkflowState, DEFAULT_MAX_RETRIES};
    use crate::services::workflow_store::RetentionPolicy;

    #[tokio::test]
    async fn test_sweeper_applies_entry_cap() {
        let store = WorkflowStore::new().with_retention(RetentionPolicy {
            max_terminal_age: None,
            max_terminal_entries: Some(0),
        });
        let task = OrchestratorTask::new("t-1", "custom", "noop", "ws-1", "u-1");
        let state = WorkflowState::new(&task, DEFAULT_MAX_RETRIES);
        let id = state.id;
        store.insert(state).await;
        store.update(id, |s| s.complete()).await.unwrap();

        let handle = RetentionSweeper::new(store.clone(), Duration::from_millis(10)).spawn();
        for _ in 0..50 {
            if handle.evicted_total() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.get(id).await.is_none());
        assert_eq!(handle.evicted_total(), 1);
        handle.stop().await;
    }
}
