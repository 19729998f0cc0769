//! Context checkpoint port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::CheckpointError;
use crate::domain::models::PhaseName;

/// Saved output of one phase, used to seed a retried phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub phase: PhaseName,
    pub result: serde_json::Value,
}

/// Key under which a workflow's phase context is checkpointed.
pub fn checkpoint_key(workflow_id: Uuid, phase: PhaseName) -> String {
    format!("{workflow_id}:{phase}")
}

/// Best-effort storage of per-phase agent context.
///
/// Callers log and discard every error returned here.
#[async_trait]
pub trait ContextCheckpointStore: Send + Sync {
    async fn save_context(&self, key: &str, snapshot: ContextSnapshot) -> Result<(), CheckpointError>;

    async fn recover_context(&self, key: &str) -> Result<Option<ContextSnapshot>, CheckpointError>;
}
