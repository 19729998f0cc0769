//! Workflow state machine types.
//!
//! One `WorkflowState` exists per accepted task. It is mutated in place as
//! phases progress and is never deleted by the orchestrator itself.
//!
//! ```text
//! Planning → Implementation → Qa → Deployment → Completed
//!     ↘            ↘            ↘        ↘
//!                         Failed
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::agent::AgentRole;
use super::agent_task::PhaseResult;
use super::task::{AutonomyMode, OrchestratorTask};
use crate::domain::errors::{DomainError, DomainResult};

/// Error recorded when a workflow is cancelled.
pub const CANCELLED_ERROR: &str = "Workflow cancelled";

/// Default retry budget when neither the task nor the config sets one.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Current position of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowPhase {
    Planning,
    Implementation,
    Qa,
    Deployment,
    Completed,
    Failed,
}

impl WorkflowPhase {
    /// Whether this is a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Position along the forward path. `Failed` sits outside it.
    fn rank(self) -> u8 {
        match self {
            Self::Planning => 0,
            Self::Implementation => 1,
            Self::Qa => 2,
            Self::Deployment => 3,
            Self::Completed => 4,
            Self::Failed => u8::MAX,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Implementation => "implementation",
            Self::Qa => "qa",
            Self::Deployment => "deployment",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a unit of phase work, used as the `phase_results` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseName {
    Planning,
    Implementation,
    Qa,
    Deployment,
    Rollback,
}

impl PhaseName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Implementation => "implementation",
            Self::Qa => "qa",
            Self::Deployment => "deployment",
            Self::Rollback => "rollback",
        }
    }

    /// Workflow phase this work runs under. Rollback belongs to deployment.
    pub fn workflow_phase(&self) -> WorkflowPhase {
        match self {
            Self::Planning => WorkflowPhase::Planning,
            Self::Implementation => WorkflowPhase::Implementation,
            Self::Qa => WorkflowPhase::Qa,
            Self::Deployment | Self::Rollback => WorkflowPhase::Deployment,
        }
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the append-only agent spawn log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpawn {
    pub agent_type: AgentRole,
    pub agent_id: Uuid,
    pub phase: PhaseName,
    pub spawned_at: DateTime<Utc>,
}

/// A phase that ran under an approval gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    pub phase: PhaseName,
    pub recorded_at: DateTime<Utc>,
}

/// Mutable state of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub id: Uuid,
    pub task_id: String,
    pub workspace_id: String,
    pub task_type: String,
    pub phase: WorkflowPhase,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Currently active agent per role.
    pub agents: BTreeMap<AgentRole, Uuid>,
    /// Every agent ever spawned for this workflow, in spawn order.
    pub agent_history: Vec<AgentSpawn>,
    pub phase_results: BTreeMap<PhaseName, PhaseResult>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub error: Option<String>,
    pub autonomy_mode: AutonomyMode,
    pub approval_gates: Vec<String>,
    #[serde(default)]
    pub approval_log: Vec<ApprovalRecord>,
}

impl WorkflowState {
    /// Build the initial state for a task, applying defaults the task does not override.
    pub fn new(task: &OrchestratorTask, default_max_retries: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            task_id: task.id.clone(),
            workspace_id: task.workspace_id.clone(),
            task_type: task.task_type.clone(),
            phase: WorkflowPhase::Planning,
            started_at: now,
            updated_at: now,
            completed_at: None,
            agents: BTreeMap::new(),
            agent_history: Vec::new(),
            phase_results: BTreeMap::new(),
            retry_count: 0,
            max_retries: task.max_retries_override().unwrap_or(default_max_retries),
            error: None,
            autonomy_mode: task.autonomy_mode.unwrap_or_default(),
            approval_gates: task.approval_gates.clone().unwrap_or_default(),
            approval_log: Vec::new(),
        }
    }

    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    fn ensure_active(&self, to: WorkflowPhase) -> DomainResult<()> {
        if self.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.phase,
                to,
            });
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Move forward to `phase`. Moving to an earlier or equal phase is a no-op,
    /// so re-running implementation during a QA retry leaves `phase` at `qa`.
    pub fn advance_to(&mut self, phase: WorkflowPhase) -> DomainResult<()> {
        self.ensure_active(phase)?;
        if phase.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.phase,
                to: phase,
            });
        }
        if phase.rank() > self.phase.rank() {
            self.phase = phase;
        }
        self.touch();
        Ok(())
    }

    /// Record a freshly spawned agent.
    ///
    /// The spawn is always appended to the history. The active-agent map is
    /// only updated while the workflow is live; on a terminal workflow this
    /// returns `WorkflowTerminated` so the caller can release the agent.
    pub fn record_agent(&mut self, role: AgentRole, agent_id: Uuid, phase: PhaseName) -> DomainResult<()> {
        self.agent_history.push(AgentSpawn {
            agent_type: role,
            agent_id,
            phase,
            spawned_at: Utc::now(),
        });
        self.touch();
        if self.is_terminal() {
            return Err(DomainError::WorkflowTerminated(self.id));
        }
        self.agents.insert(role, agent_id);
        Ok(())
    }

    pub fn record_phase_result(&mut self, phase: PhaseName, result: PhaseResult) -> DomainResult<()> {
        self.ensure_active(phase.workflow_phase())?;
        self.phase_results.insert(phase, result);
        self.touch();
        Ok(())
    }

    pub fn record_approval_gate(&mut self, phase: PhaseName) {
        self.approval_log.push(ApprovalRecord {
            phase,
            recorded_at: Utc::now(),
        });
        self.touch();
    }

    /// Count one more implementation/QA attempt and return the new count.
    pub fn increment_retry(&mut self) -> DomainResult<u32> {
        self.ensure_active(self.phase)?;
        self.retry_count += 1;
        self.touch();
        Ok(self.retry_count)
    }

    /// Exhaustion test: `retry_count > max_retries`.
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count > self.max_retries
    }

    pub fn complete(&mut self) -> DomainResult<()> {
        self.ensure_active(WorkflowPhase::Completed)?;
        let now = Utc::now();
        self.phase = WorkflowPhase::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Declare the workflow failed. The error is set here and nowhere else.
    pub fn fail(&mut self, reason: impl Into<String>) -> DomainResult<()> {
        self.ensure_active(WorkflowPhase::Failed)?;
        let now = Utc::now();
        self.phase = WorkflowPhase::Failed;
        self.error = Some(reason.into());
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Whether the workflow was ended by cancellation.
    pub fn was_cancelled(&self) -> bool {
        self.phase == WorkflowPhase::Failed && self.error.as_deref() == Some(CANCELLED_ERROR)
    }

    /// Whether `phase` is gated for approval under the workflow's autonomy mode.
    pub fn is_gated(&self, phase: PhaseName) -> bool {
        self.autonomy_mode == AutonomyMode::Semi
            && self.approval_gates.iter().any(|gate| gate == phase.as_str())
    }
}
