//! Centralized event construction helpers.
//!
//! Eliminates the repetitive boilerplate of building `WorkflowEvent` structs
//! (EventId::new(), SequenceNumber(0), Utc::now(), etc.) scattered across services.

use chrono::Utc;
use uuid::Uuid;

use super::event_bus::{EventId, SequenceNumber, WorkflowEvent, WorkflowEventKind};
use crate::domain::models::{Agent, PhaseName};

/// Build a `WorkflowEvent` with standard defaults.
///
/// Sequence is set to 0 (assigned by EventBus on publish).
/// Severity follows the event kind.
pub fn make_event(
    kind: WorkflowEventKind,
    workflow_id: Uuid,
    phase: Option<PhaseName>,
    data: serde_json::Value,
) -> WorkflowEvent {
    WorkflowEvent {
        id: EventId::new(),
        sequence: SequenceNumber(0),
        timestamp: Utc::now(),
        severity: kind.severity(),
        kind,
        workflow_id,
        phase,
        data,
    }
}

/// Build a workflow-level event (no phase).
pub fn workflow_event(kind: WorkflowEventKind, workflow_id: Uuid, data: serde_json::Value) -> WorkflowEvent {
    make_event(kind, workflow_id, None, data)
}

/// Build a phase-scoped event.
pub fn phase_event(
    kind: WorkflowEventKind,
    workflow_id: Uuid,
    phase: PhaseName,
    data: serde_json::Value,
) -> WorkflowEvent {
    make_event(kind, workflow_id, Some(phase), data)
}

/// Build an agent event carrying the agent's id and role.
pub fn agent_event(
    kind: WorkflowEventKind,
    workflow_id: Uuid,
    phase: PhaseName,
    agent: &Agent,
) -> WorkflowEvent {
    make_event(
        kind,
        workflow_id,
        Some(phase),
        serde_json::json!({
            "agentId": agent.id,
            "agentType": agent.role,
        }),
    )
}
