use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Logical role an agent plays inside a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Planner,
    Dev,
    Qa,
    #[serde(rename = "devops")]
    DevOps,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Dev => "dev",
            Self::Qa => "qa",
            Self::DevOps => "devops",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planner" => Ok(Self::Planner),
            "dev" => Ok(Self::Dev),
            "qa" => Ok(Self::Qa),
            "devops" => Ok(Self::DevOps),
            _ => Err(anyhow::anyhow!("Invalid agent role: {s}")),
        }
    }
}

/// Agent status as reported by the agent gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Busy,
    Completed,
    Failed,
    Terminated,
}

impl AgentStatus {
    /// Whether the agent may still do work.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Idle | Self::Busy)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Busy => write!(f, "busy"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

impl FromStr for AgentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(Self::Idle),
            "busy" => Ok(Self::Busy),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "terminated" => Ok(Self::Terminated),
            _ => Err(anyhow::anyhow!("Invalid agent status: {s}")),
        }
    }
}

/// Agent record owned by the agent gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Unique agent identifier
    pub id: Uuid,

    pub role: AgentRole,

    pub workspace_id: String,

    pub status: AgentStatus,

    /// User the agent was created on behalf of
    pub created_by: String,

    /// Configuration forwarded by the orchestrator at creation time
    #[serde(default)]
    pub config: serde_json::Value,

    pub created_at: DateTime<Utc>,

    pub terminated_at: Option<DateTime<Utc>>,
}

impl Agent {
    /// Create an idle agent from a creation request.
    pub fn from_request(request: &CreateAgentRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: request.role,
            workspace_id: request.workspace_id.clone(),
            status: AgentStatus::Idle,
            created_by: request.created_by.clone(),
            config: request.config.clone(),
            created_at: Utc::now(),
            terminated_at: None,
        }
    }

    /// Terminate the agent
    pub fn terminate(&mut self) {
        self.status = AgentStatus::Terminated;
        self.terminated_at = Some(Utc::now());
    }
}

/// Request handed to [`AgentGateway::create_agent`](crate::domain::ports::AgentGateway::create_agent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRequest {
    #[serde(rename = "type")]
    pub role: AgentRole,
    pub workspace_id: String,
    pub created_by: String,
    pub config: serde_json::Value,
}

/// One page of agents from the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentPage {
    pub agents: Vec<Agent>,
    pub total: usize,
}
