//! Domain errors for the Convoy orchestrator.

use thiserror::Error;
use uuid::Uuid;

use super::models::WorkflowPhase;

/// Domain-level errors raised by the workflow state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(Uuid),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: WorkflowPhase, to: WorkflowPhase },

    #[error("Workflow {0} is already terminal")]
    WorkflowTerminated(Uuid),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Errors surfaced by the agent gateway and the per-role executors.
///
/// The `Display` form of [`AgentError::Execution`] and [`AgentError::Unavailable`]
/// is the raw upstream message; it is recorded verbatim as a failed workflow's `error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("{0}")]
    Execution(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Agent not found: {0}")]
    NotFound(Uuid),
}

/// Errors from the context checkpoint store. Always logged and swallowed by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckpointError {
    #[error("Failed to save context {key}: {reason}")]
    SaveFailed { key: String, reason: String },

    #[error("Failed to recover context {key}: {reason}")]
    RecoverFailed { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CheckpointError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors that cross the orchestrator's public boundary.
///
/// Every other failure is captured in the returned workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),
}
