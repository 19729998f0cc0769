pub mod agent;
pub mod agent_task;
pub mod config;
pub mod task;
pub mod workflow_state;

pub use agent::{Agent, AgentPage, AgentRole, AgentStatus, CreateAgentRequest};
pub use agent_task::{
    AgentRequest, DevOpsResult, DevOpsTask, DevResult, DevStatus, DevTask, PhaseResult,
    PlanResult, PlanStatus, PlannerTask, QaResult, QaStatus, QaTask, TestResults,
};
pub use config::{Config, EventsConfig, LoggingConfig, OrchestratorConfig, RetentionConfig};
pub use task::{
    AutonomyMode, OrchestratorTask, TaskType, CONFIG_ENVIRONMENT, CONFIG_MAX_RETRIES,
    CONFIG_SPRINT_ID,
};
pub use workflow_state::{
    AgentSpawn, ApprovalRecord, PhaseName, WorkflowPhase, WorkflowState, CANCELLED_ERROR,
    DEFAULT_MAX_RETRIES,
};
