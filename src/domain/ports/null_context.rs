//! Null context checkpoint store.
//!
//! Used when checkpointing is not needed but the orchestrator requires a
//! ContextCheckpointStore implementation.

use async_trait::async_trait;

use super::context_store::{ContextCheckpointStore, ContextSnapshot};
use crate::domain::errors::CheckpointError;

/// A no-op checkpoint store that keeps nothing.
#[derive(Debug, Clone, Default)]
pub struct NullContextStore;

impl NullContextStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContextCheckpointStore for NullContextStore {
    async fn save_context(&self, _key: &str, _snapshot: ContextSnapshot) -> Result<(), CheckpointError> {
        Ok(())
    }

    async fn recover_context(&self, _key: &str) -> Result<Option<ContextSnapshot>, CheckpointError> {
        Ok(None)
    }
}
