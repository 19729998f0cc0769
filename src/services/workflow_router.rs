//! Task type routing.
//!
//! Maps a task's declared type to the phases its workflow runs. Unknown types
//! are rejected here, before any workflow state or agent exists.

use serde::Serialize;

use super::retry_controller::VerificationKind;
use crate::domain::errors::OrchestratorError;
use crate::domain::models::{OrchestratorTask, PhaseName, TaskType};

/// The phase plan of one task type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    pub task_type: TaskType,
    /// Phases in execution order. A rollback phase only runs after a failed smoke test.
    pub phases: Vec<PhaseName>,
    /// Set when implementation and QA run as a retry loop.
    pub verification: Option<VerificationKind>,
    /// Whether a failed deployment is rolled back.
    pub guarded_deployment: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowRouter;

impl WorkflowRouter {
    /// Parse the task's declared type.
    pub fn route(task: &OrchestratorTask) -> Result<TaskType, OrchestratorError> {
        task.task_type
            .parse::<TaskType>()
            .map_err(OrchestratorError::UnknownTaskType)
    }

    /// Phases run for `task_type`, in order.
    pub fn phase_sequence(task_type: TaskType) -> &'static [PhaseName] {
        match task_type {
            TaskType::ImplementFeature => &[
                PhaseName::Planning,
                PhaseName::Implementation,
                PhaseName::Qa,
            ],
            TaskType::FixBug => &[PhaseName::Implementation, PhaseName::Qa],
            TaskType::Deploy => &[PhaseName::Deployment],
            TaskType::FullLifecycle => &[
                PhaseName::Planning,
                PhaseName::Implementation,
                PhaseName::Qa,
                PhaseName::Deployment,
            ],
            TaskType::Custom => &[],
        }
    }

    /// Retry loop flavour for `task_type`, if it verifies work with QA.
    pub fn verification(task_type: TaskType) -> Option<VerificationKind> {
        match task_type {
            TaskType::ImplementFeature | TaskType::FullLifecycle => Some(VerificationKind::Feature),
            TaskType::FixBug => Some(VerificationKind::BugFix),
            TaskType::Deploy | TaskType::Custom => None,
        }
    }

    /// The full plan for a task, without side effects.
    pub fn plan(task: &OrchestratorTask) -> Result<RoutePlan, OrchestratorError> {
        let task_type = Self::route(task)?;
        let phases = Self::phase_sequence(task_type).to_vec();
        Ok(RoutePlan {
            task_type,
            guarded_deployment: phases.contains(&PhaseName::Deployment),
            verification: Self::verification(task_type),
            phases,
        })
    }
}
