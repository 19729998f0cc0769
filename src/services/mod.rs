//! Service layer
//!
//! Orchestration logic built on the domain ports:
//! - WorkflowOrchestrator: public surface driving workflows to a terminal state
//! - PhaseExecutor: runs one phase against one agent
//! - RetryController / DeploymentGuard: implementation/QA loop and rollback policy
//! - CancellationController / AgentMonitor: cancellation and agent visibility
//! - WorkflowStore / RetentionSweeper: workflow registry and its eviction
//! - EventBus: typed lifecycle events

pub mod agent_monitor;
pub mod approval_gate;
pub mod cancellation;
pub mod deployment_guard;
pub mod event_bus;
pub mod event_factory;
pub mod orchestrator;
pub mod phase_executor;
pub mod retention_sweeper;
pub mod retry_controller;
pub mod workflow_router;
pub mod workflow_store;

pub use agent_monitor::{AgentMonitor, AgentOverview};
pub use approval_gate::{ApprovalGate, GateDecision};
pub use cancellation::{CancelOutcome, CancellationController};
pub use deployment_guard::{DeploymentGuard, DeploymentOutcome};
pub use event_bus::{EventBus, EventBusConfig, WorkflowEvent, WorkflowEventKind};
pub use orchestrator::{OrchestratorResult, ResultStatus, WorkflowOrchestrator};
pub use phase_executor::{PhaseExecutor, PhaseFailure, PhaseSpec, RunContext};
pub use retention_sweeper::{RetentionSweeper, SweeperHandle};
pub use retry_controller::{LoopOutcome, RetryController, VerificationKind};
pub use workflow_router::{RoutePlan, WorkflowRouter};
pub use workflow_store::{RetentionPolicy, WorkflowStore};
