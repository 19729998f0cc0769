//! Domain layer for the Convoy orchestrator
//!
//! Core models, the workflow state machine, errors, and the port traits
//! external collaborators implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{AgentError, CheckpointError, DomainError, DomainResult, OrchestratorError};
