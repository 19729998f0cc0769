//! In-memory registry of workflow states, keyed by workflow id.
//!
//! The store is the only shared mutable resource of the orchestrator. Every
//! mutation runs as a closure under the write lock, so concurrent pipelines
//! touching different workflows never corrupt each other and a cancellation
//! is never overwritten by a stale copy of the same workflow.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{RetentionConfig, WorkflowState};

/// Which terminal workflows may be dropped from the store.
///
/// The default keeps everything for the life of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Evict terminal workflows completed longer ago than this.
    pub max_terminal_age: Option<Duration>,
    /// Keep at most this many terminal workflows, dropping the oldest first.
    pub max_terminal_entries: Option<usize>,
}

impl RetentionPolicy {
    /// Keep every workflow.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_terminal_age.is_none() && self.max_terminal_entries.is_none()
    }
}

impl From<&RetentionConfig> for RetentionPolicy {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            max_terminal_age: config
                .max_terminal_age_secs
                .and_then(|secs| i64::try_from(secs).ok())
                .map(Duration::seconds),
            max_terminal_entries: config.max_terminal_entries,
        }
    }
}

/// Shared handle to the workflow registry. Cloning shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct WorkflowStore {
    workflows: Arc<RwLock<HashMap<Uuid, WorkflowState>>>,
    retention: RetentionPolicy,
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    /// Register a workflow, replacing any previous state under the same id.
    pub async fn insert(&self, state: WorkflowState) {
        let mut workflows = self.workflows.write().await;
        workflows.insert(state.id, state);
    }

    /// Snapshot of a workflow, or `None` if unknown.
    pub async fn get(&self, id: Uuid) -> Option<WorkflowState> {
        self.workflows.read().await.get(&id).cloned()
    }

    /// Most recently started workflow created for a caller task id.
    pub async fn find_by_task(&self, task_id: &str) -> Option<WorkflowState> {
        self.workflows
            .read()
            .await
            .values()
            .filter(|s| s.task_id == task_id)
            .max_by_key(|s| s.started_at)
            .cloned()
    }

    /// Mutate a workflow in place under the write lock.
    ///
    /// Changes made by `f` are kept even when it returns an error.
    pub async fn update<F, R>(&self, id: Uuid, f: F) -> DomainResult<R>
    where
        F: FnOnce(&mut WorkflowState) -> DomainResult<R>,
    {
        let mut workflows = self.workflows.write().await;
        let state = workflows
            .get_mut(&id)
            .ok_or(DomainError::WorkflowNotFound(id))?;
        f(state)
    }

    /// Non-terminal workflows of a workspace, oldest first.
    pub async fn active_for_workspace(&self, workspace_id: &str) -> Vec<WorkflowState> {
        let mut active: Vec<WorkflowState> = self
            .workflows
            .read()
            .await
            .values()
            .filter(|s| s.workspace_id == workspace_id && !s.is_terminal())
            .cloned()
            .collect();
        active.sort_by_key(|s| s.started_at);
        active
    }

    pub async fn len(&self) -> usize {
        self.workflows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workflows.read().await.is_empty()
    }

    /// Apply the retention policy as of `now`. Returns how many workflows were removed.
    ///
    /// Active workflows are never evicted.
    pub async fn evict_terminal(&self, now: DateTime<Utc>) -> usize {
        if self.retention.is_unbounded() {
            return 0;
        }

        let mut workflows = self.workflows.write().await;
        let before = workflows.len();

        if let Some(max_age) = self.retention.max_terminal_age {
            workflows.retain(|_, s| match s.completed_at {
                Some(done) if s.is_terminal() => now - done <= max_age,
                _ => true,
            });
        }

        if let Some(cap) = self.retention.max_terminal_entries {
            let mut terminal: Vec<(DateTime<Utc>, Uuid)> = workflows
                .values()
                .filter(|s| s.is_terminal())
                .map(|s| (s.completed_at.unwrap_or(s.updated_at), s.id))
                .collect();
            if terminal.len() > cap {
                terminal.sort();
                let excess = terminal.len() - cap;
                for (_, id) in terminal.into_iter().take(excess) {
                    workflows.remove(&id);
                }
            }
        }

        let evicted = before - workflows.len();
        if evicted > 0 {
            debug!(evicted, remaining = workflows.len(), "Evicted terminal workflows");
        }
        evicted
    }
}
