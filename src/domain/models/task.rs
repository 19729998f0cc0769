//! Caller-supplied orchestration tasks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Config key overriding the workflow's retry budget.
pub const CONFIG_MAX_RETRIES: &str = "maxRetries";
/// Config key selecting the deployment environment.
pub const CONFIG_ENVIRONMENT: &str = "environment";
/// Config key passed through to the planner.
pub const CONFIG_SPRINT_ID: &str = "sprintId";

/// Kind of delivery work a task asks for.
///
/// The wire form of a task keeps its type as a free string so that unknown
/// types reach the router and are rejected there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    ImplementFeature,
    FixBug,
    Deploy,
    FullLifecycle,
    Custom,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImplementFeature => "implement-feature",
            Self::FixBug => "fix-bug",
            Self::Deploy => "deploy",
            Self::FullLifecycle => "full-lifecycle",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "implement-feature" => Ok(Self::ImplementFeature),
            "fix-bug" => Ok(Self::FixBug),
            "deploy" => Ok(Self::Deploy),
            "full-lifecycle" => Ok(Self::FullLifecycle),
            "custom" => Ok(Self::Custom),
            other => Err(other.to_string()),
        }
    }
}

/// How much human oversight a workflow runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutonomyMode {
    #[default]
    Full,
    Semi,
}

impl fmt::Display for AutonomyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Semi => write!(f, "semi"),
        }
    }
}

/// A unit of delivery work submitted to the orchestrator.
///
/// Immutable once accepted; the orchestrator only reads from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorTask {
    /// Caller-assigned identifier used for tracing.
    pub id: String,

    /// Declared task type, parsed by the router.
    #[serde(rename = "type")]
    pub task_type: String,

    pub description: String,

    pub workspace_id: String,

    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Free-form settings (`maxRetries`, `environment`, `sprintId`, ...).
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomy_mode: Option<AutonomyMode>,

    /// Phase names that require sign-off in semi-autonomous mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_gates: Option<Vec<String>>,
}

impl OrchestratorTask {
    /// Create a task with the required fields and no overrides.
    pub fn new(
        id: impl Into<String>,
        task_type: impl Into<String>,
        description: impl Into<String>,
        workspace_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            task_type: task_type.into(),
            description: description.into(),
            workspace_id: workspace_id.into(),
            user_id: user_id.into(),
            project_id: None,
            config: serde_json::Map::new(),
            autonomy_mode: None,
            approval_gates: None,
        }
    }

    /// Set a config entry.
    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_autonomy_mode(mut self, mode: AutonomyMode) -> Self {
        self.autonomy_mode = Some(mode);
        self
    }

    /// Phases to gate. Gates only apply in [`AutonomyMode::Semi`].
    pub fn with_approval_gates(mut self, gates: Vec<String>) -> Self {
        self.approval_gates = Some(gates);
        self
    }

    /// `config.maxRetries` when present and a non-negative integer.
    pub fn max_retries_override(&self) -> Option<u32> {
        self.config
            .get(CONFIG_MAX_RETRIES)
            .and_then(serde_json::Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }

    /// `config.environment` when present.
    pub fn environment(&self) -> Option<&str> {
        self.config.get(CONFIG_ENVIRONMENT).and_then(serde_json::Value::as_str)
    }

    pub fn sprint_id(&self) -> Option<&serde_json::Value> {
        self.config.get(CONFIG_SPRINT_ID)
    }
}
