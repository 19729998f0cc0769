//! Port trait definitions (Hexagonal Architecture)
//!
//! The orchestrator reaches its external collaborators only through these traits:
//! - AgentGateway: agent records (create, query, terminate)
//! - PlannerExecutor / DevExecutor / QaExecutor / DevOpsExecutor: per-role task execution
//! - ContextCheckpointStore: best-effort per-phase context snapshots

pub mod agent_gateway;
pub mod context_store;
pub mod null_context;

pub use agent_gateway::{
    AgentExecutors, AgentGateway, DevExecutor, DevOpsExecutor, PlannerExecutor, QaExecutor,
};
pub use context_store::{checkpoint_key, ContextCheckpointStore, ContextSnapshot};
pub use null_context::NullContextStore;
