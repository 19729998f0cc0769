//! In-memory context checkpoint store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::CheckpointError;
use crate::domain::ports::{ContextCheckpointStore, ContextSnapshot};

/// `ContextCheckpointStore` backed by a process-local map.
///
/// Saves and recoveries can be switched to fail, to exercise the
/// orchestrator's best-effort handling of checkpoint errors.
#[derive(Debug, Default)]
pub struct InMemoryContextStore {
    snapshots: RwLock<HashMap<String, ContextSnapshot>>,
    fail_saves: AtomicBool,
    fail_recovers: AtomicBool,
    saves: AtomicU64,
    recovers: AtomicU64,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::Release);
    }

    pub fn fail_recovers(&self, fail: bool) {
        self.fail_recovers.store(fail, Ordering::Release);
    }

    pub async fn get(&self, key: &str) -> Option<ContextSnapshot> {
        self.snapshots.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }

    /// Save attempts, including failed ones.
    pub fn save_attempts(&self) -> u64 {
        self.saves.load(Ordering::Acquire)
    }

    /// Recovery attempts, including failed ones.
    pub fn recover_attempts(&self) -> u64 {
        self.recovers.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ContextCheckpointStore for InMemoryContextStore {
    async fn save_context(&self, key: &str, snapshot: ContextSnapshot) -> Result<(), CheckpointError> {
        self.saves.fetch_add(1, Ordering::AcqRel);
        if self.fail_saves.load(Ordering::Acquire) {
            return Err(CheckpointError::SaveFailed {
                key: key.to_string(),
                reason: "checkpoint store offline".to_string(),
            });
        }
        self.snapshots.write().await.insert(key.to_string(), snapshot);
        Ok(())
    }

    async fn recover_context(&self, key: &str) -> Result<Option<ContextSnapshot>, CheckpointError> {
        self.recovers.fetch_add(1, Ordering::AcqRel);
        if self.fail_recovers.load(Ordering::Acquire) {
            return Err(CheckpointError::RecoverFailed {
                key: key.to_string(),
                reason: "checkpoint store offline".to_string(),
            });
        }
        Ok(self.snapshots.read().await.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PhaseName;
    use serde_json::json;

    fn snapshot() -> ContextSnapshot {
        ContextSnapshot {
            phase: PhaseName::Implementation,
            result: json!({"status": "implemented"}),
        }
    }

    #[tokio::test]
    async fn test_save_then_recover() {
        let store = InMemoryContextStore::new();
        store.save_context("wf:implementation", snapshot()).await.unwrap();
        let recovered = store.recover_context("wf:implementation").await.unwrap();
        assert_eq!(recovered, Some(snapshot()));
        assert!(store.recover_context("wf:qa").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let store = InMemoryContextStore::new();
        store.fail_saves(true);
        store.fail_recovers(true);
        assert!(matches!(
            store.save_context("k", snapshot()).await,
            Err(CheckpointError::SaveFailed { .. })
        ));
        assert!(store.recover_context("k").await.is_err());
        assert!(store.is_empty().await);
        assert_eq!(store.save_attempts(), 1);
        assert_eq!(store.recover_attempts(), 1);
    }
}
