//! Approval gate checks for semi-autonomous workflows.
//!
//! A gate is advisory: it is recorded on the workflow and logged, and the
//! phase then runs without waiting for a human decision.

use tracing::info;

use crate::domain::models::{PhaseName, WorkflowState};

/// Result of checking a phase against the workflow's approval gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// No gate applies.
    Ungated,
    /// A gate applies; execution proceeds and the gate is recorded.
    Advisory,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApprovalGate;

impl ApprovalGate {
    pub fn check(state: &WorkflowState, phase: PhaseName) -> GateDecision {
        if state.is_gated(phase) {
            GateDecision::Advisory
        } else {
            GateDecision::Ungated
        }
    }

    /// Check `phase` and record the gate on `state` when it applies.
    pub fn apply(state: &mut WorkflowState, phase: PhaseName) -> GateDecision {
        let decision = Self::check(state, phase);
        if decision == GateDecision::Advisory {
            state.record_approval_gate(phase);
            info!(
                workflow_id = %state.id,
                phase = %phase,
                autonomy_mode = %state.autonomy_mode,
                "Approval gate in effect; continuing without blocking"
            );
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AutonomyMode, OrchestratorTask, DEFAULT_MAX_RETRIES};

    fn state(task: &OrchestratorTask) -> WorkflowState {
        WorkflowState::new(task, DEFAULT_MAX_RETRIES)
    }

    #[test]
    fn test_full_autonomy_ignores_gates() {
        let task = OrchestratorTask::new("t", "deploy", "ship", "ws", "u")
            .with_approval_gates(vec!["deployment".to_string()]);
        let mut state = state(&task);
        assert_eq!(ApprovalGate::apply(&mut state, PhaseName::Deployment), GateDecision::Ungated);
        assert!(state.approval_log.is_empty());
    }

    #[test]
    fn test_semi_autonomy_records_gate() {
        let task = OrchestratorTask::new("t", "deploy", "ship", "ws", "u")
            .with_autonomy_mode(AutonomyMode::Semi)
            .with_approval_gates(vec!["deployment".to_string()]);
        let mut state = state(&task);
        assert_eq!(ApprovalGate::apply(&mut state, PhaseName::Deployment), GateDecision::Advisory);
        assert_eq!(ApprovalGate::apply(&mut state, PhaseName::Rollback), GateDecision::Ungated);
        assert_eq!(state.approval_log.len(), 1);
        assert_eq!(state.approval_log[0].phase, PhaseName::Deployment);
    }
}
