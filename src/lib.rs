//! Convoy - Multi-Agent Workflow Orchestrator
//!
//! Convoy drives a software-delivery task through a pipeline of role-specialised
//! agents (planner, developer, QA, DevOps). It creates and tracks an agent per
//! phase, loops implementation and QA until QA passes or retries run out, rolls
//! back deployments whose smoke tests fail, and supports cancelling in-flight
//! workflows.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Workflow models, errors and the agent/checkpoint ports
//! - **Service Layer** (`services`): Routing, phase execution, retry and rollback logic
//! - **Infrastructure Layer** (`infrastructure`): Configuration, logging and in-memory adapters
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use convoy::{AgentExecutors, Config, OrchestratorTask, WorkflowOrchestrator};
//! use convoy::infrastructure::memory::{InMemoryContextStore, ScriptedAgents};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let agents = Arc::new(ScriptedAgents::default());
//!     let orchestrator = WorkflowOrchestrator::from_config(
//!         agents.clone(),
//!         AgentExecutors::from_shared(agents),
//!         Arc::new(InMemoryContextStore::new()),
//!         &Config::default(),
//!     );
//!     let task = OrchestratorTask::new("t-1", "implement-feature", "Add search", "ws-1", "u-1");
//!     let result = orchestrator.execute_task(&task).await?;
//!     println!("{}", result.status);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{AgentError, CheckpointError, OrchestratorError};
pub use domain::models::{
    Agent, AgentRole, AgentStatus, Config, OrchestratorTask, PhaseName, TaskType, WorkflowPhase,
    WorkflowState,
};
pub use domain::ports::{AgentExecutors, AgentGateway, ContextCheckpointStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{OrchestratorResult, ResultStatus, WorkflowOrchestrator};
