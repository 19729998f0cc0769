//! Typed task payloads and results exchanged with the per-role executors.
//!
//! Each role returns a differently-shaped result. The orchestrator only ever
//! inspects `QaResult::test_results.failed` and the `smoke_tests_passed` flag
//! of a deployment; everything else rides along in the `extra` maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::agent::AgentRole;

/// Work handed to a planner agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum PlannerTask {
    CreatePlan {
        description: String,
        project_id: Option<String>,
        sprint_id: Option<Value>,
    },
}

/// Work handed to a dev agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum DevTask {
    ImplementStory {
        description: String,
        plan: Option<Value>,
    },
    FixBug {
        description: String,
    },
}

/// Work handed to a QA agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum QaTask {
    RunTests { files: Vec<String> },
}

/// Work handed to a devops agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum DevOpsTask {
    Deploy {
        environment: String,
        project_id: Option<String>,
    },
    Rollback {
        deployment_id: String,
        environment: String,
    },
}

/// A role-tagged request, dispatched by the phase executor to the matching executor.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentRequest {
    Planner(PlannerTask),
    Dev(DevTask),
    Qa(QaTask),
    DevOps(DevOpsTask),
}

impl AgentRequest {
    /// The agent role able to serve this request.
    pub fn role(&self) -> AgentRole {
        match self {
            Self::Planner(_) => AgentRole::Planner,
            Self::Dev(_) => AgentRole::Dev,
            Self::Qa(_) => AgentRole::Qa,
            Self::DevOps(_) => AgentRole::DevOps,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    PlanCreated,
}

/// Planner output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub status: PlanStatus,
    #[serde(default)]
    pub stories: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevStatus {
    Implemented,
    Fixed,
    Partial,
}

/// Dev output for both story implementation and bug fixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevResult {
    pub status: DevStatus,
    #[serde(default)]
    pub files_generated: Vec<String>,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DevResult {
    /// Files QA should verify: generated first, then modified, without duplicates.
    pub fn files_for_review(&self) -> Vec<String> {
        let mut files: Vec<String> = Vec::with_capacity(
            self.files_generated.len() + self.files_modified.len(),
        );
        for file in self.files_generated.iter().chain(&self.files_modified) {
            if !files.contains(file) {
                files.push(file.clone());
            }
        }
        files
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResults {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
}

/// QA output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaResult {
    pub status: QaStatus,
    pub test_results: TestResults,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QaResult {
    pub fn passed(&self) -> bool {
        self.test_results.failed == 0
    }
}

/// Devops output, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DevOpsResult {
    Deployed {
        deployment_id: String,
        smoke_tests_passed: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    RollbackCompleted {
        deployment_id: String,
    },
    RollbackFailed {
        deployment_id: String,
        reason: String,
    },
}

impl DevOpsResult {
    /// True only for a deployment whose smoke tests passed.
    pub fn smoke_tests_passed(&self) -> bool {
        matches!(self, Self::Deployed { smoke_tests_passed: true, .. })
    }

    pub fn deployment_id(&self) -> &str {
        match self {
            Self::Deployed { deployment_id, .. }
            | Self::RollbackCompleted { deployment_id }
            | Self::RollbackFailed { deployment_id, .. } => deployment_id,
        }
    }

    /// Wire name of the status tag.
    pub fn status_str(&self) -> &'static str {
        match self {
            Self::Deployed { .. } => "deployed",
            Self::RollbackCompleted { .. } => "rollback_completed",
            Self::RollbackFailed { .. } => "rollback_failed",
        }
    }
}

/// Result payload recorded under `phase_results`.
///
/// Serialized untagged so the wire form is the role's own result shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhaseResult {
    DevOps(DevOpsResult),
    Qa(QaResult),
    Implementation(DevResult),
    Plan(PlanResult),
}

impl PhaseResult {
    pub fn as_dev(&self) -> Option<&DevResult> {
        match self {
            Self::Implementation(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_qa(&self) -> Option<&QaResult> {
        match self {
            Self::Qa(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_devops(&self) -> Option<&DevOpsResult> {
        match self {
            Self::DevOps(r) => Some(r),
            _ => None,
        }
    }

    /// JSON form, for forwarding into agent configs and checkpoints.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
