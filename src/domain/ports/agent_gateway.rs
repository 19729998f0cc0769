//! Agent gateway and executor ports.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::AgentError;
use crate::domain::models::{
    Agent, AgentPage, CreateAgentRequest, DevOpsResult, DevOpsTask, DevResult, DevTask,
    PlanResult, PlannerTask, QaResult, QaTask,
};

/// Interface to the service owning agent records.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Create a new agent and return its record.
    async fn create_agent(&self, request: CreateAgentRequest) -> Result<Agent, AgentError>;

    /// Get an agent by ID within a workspace.
    ///
    /// # Returns
    /// * `Ok(Some(agent))` if found
    /// * `Ok(None)` if not found
    async fn get_agent(&self, id: Uuid, workspace_id: &str) -> Result<Option<Agent>, AgentError>;

    /// List at most `limit` agents of a workspace, with the workspace total.
    async fn list_agents(&self, workspace_id: &str, limit: usize) -> Result<AgentPage, AgentError>;

    /// Terminate an agent. Callers treat failures as warnings.
    async fn terminate_agent(&self, id: Uuid, workspace_id: &str) -> Result<(), AgentError>;
}

#[async_trait]
pub trait PlannerExecutor: Send + Sync {
    async fn execute_task(&self, agent: &Agent, task: PlannerTask) -> Result<PlanResult, AgentError>;
}

#[async_trait]
pub trait DevExecutor: Send + Sync {
    async fn execute_task(&self, agent: &Agent, task: DevTask) -> Result<DevResult, AgentError>;
}

#[async_trait]
pub trait QaExecutor: Send + Sync {
    async fn execute_task(&self, agent: &Agent, task: QaTask) -> Result<QaResult, AgentError>;
}

#[async_trait]
pub trait DevOpsExecutor: Send + Sync {
    async fn execute_task(&self, agent: &Agent, task: DevOpsTask) -> Result<DevOpsResult, AgentError>;
}

/// The four role executors the orchestrator dispatches to.
#[derive(Clone)]
pub struct AgentExecutors {
    pub planner: Arc<dyn PlannerExecutor>,
    pub dev: Arc<dyn DevExecutor>,
    pub qa: Arc<dyn QaExecutor>,
    pub devops: Arc<dyn DevOpsExecutor>,
}

impl AgentExecutors {
    pub fn new(
        planner: Arc<dyn PlannerExecutor>,
        dev: Arc<dyn DevExecutor>,
        qa: Arc<dyn QaExecutor>,
        devops: Arc<dyn DevOpsExecutor>,
    ) -> Self {
        Self {
            planner,
            dev,
            qa,
            devops,
        }
    }

    /// Use one adapter for every role.
    pub fn from_shared<T>(adapter: Arc<T>) -> Self
    where
        T: PlannerExecutor + DevExecutor + QaExecutor + DevOpsExecutor + 'static,
    {
        Self {
            planner: adapter.clone(),
            dev: adapter.clone(),
            qa: adapter.clone(),
            devops: adapter,
        }
    }
}

impl std::fmt::Debug for AgentExecutors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentExecutors").finish_non_exhaustive()
    }
}
