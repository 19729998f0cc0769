use std::sync::Arc;

use serde::Serialize;

use crate::domain::errors::AgentError;
use crate::domain::models::{Agent, AgentStatus};
use crate::domain::ports::AgentGateway;

/// Agents of a workspace grouped by status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentOverview {
    /// Idle or busy.
    pub active: Vec<Agent>,
    pub completed: Vec<Agent>,
    /// Failed or terminated.
    pub failed: Vec<Agent>,
}

impl AgentOverview {
    pub fn partition(agents: Vec<Agent>) -> Self {
        let mut overview = Self::default();
        for agent in agents {
            match agent.status {
                AgentStatus::Idle | AgentStatus::Busy => overview.active.push(agent),
                AgentStatus::Completed => overview.completed.push(agent),
                AgentStatus::Failed | AgentStatus::Terminated => overview.failed.push(agent),
            }
        }
        overview
    }
}

#[derive(Clone)]
pub struct AgentMonitor {
    gateway: Arc<dyn AgentGateway>,
    list_limit: usize,
}

impl AgentMonitor {
    pub fn new(gateway: Arc<dyn AgentGateway>, list_limit: usize) -> Self {
        Self { gateway, list_limit }
    }

    pub async fn overview(&self, workspace_id: &str) -> Result<AgentOverview, AgentError> {
        let page = self.gateway.list_agents(workspace_id, self.list_limit).await?;
        Ok(AgentOverview::partition(page.agents))
    }
}

impl std::fmt::Debug for AgentMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentMonitor")
            .field("list_limit", &self.list_limit)
            .finish_non_exhaustive()
    }
}
