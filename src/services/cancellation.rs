//! Workflow cancellation.
//!
//! Cancellation acts on the workflow record and its agents only. An agent call
//! already in flight keeps running; the pipeline that awaits it notices the
//! terminal state afterwards and stops.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::event_bus::{EventBus, WorkflowEventKind};
use super::event_factory::workflow_event;
use super::workflow_store::WorkflowStore;
use crate::domain::models::{AgentRole, CANCELLED_ERROR};
use crate::domain::ports::AgentGateway;

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CancelOutcome {
    pub cancelled: bool,
}

#[derive(Clone)]
pub struct CancellationController {
    gateway: Arc<dyn AgentGateway>,
    store: WorkflowStore,
    events: Arc<EventBus>,
}

impl CancellationController {
    pub fn new(gateway: Arc<dyn AgentGateway>, store: WorkflowStore, events: Arc<EventBus>) -> Self {
        Self {
            gateway,
            store,
            events,
        }
    }

    /// Cancel a workflow and terminate its active agents.
    ///
    /// Unknown and already-terminal workflows report `cancelled: false`.
    /// Termination failures are logged and never change the outcome.
    pub async fn cancel(&self, workflow_id: Uuid) -> CancelOutcome {
        // Fail first so that agents spawned from here on are treated as orphans.
        let marked = self
            .store
            .update(workflow_id, |s| {
                s.fail(CANCELLED_ERROR)?;
                let agents: Vec<(AgentRole, Uuid)> =
                    s.agents.iter().map(|(role, id)| (*role, *id)).collect();
                Ok((s.workspace_id.clone(), agents))
            })
            .await;

        let (workspace_id, agents) = match marked {
            Ok(found) => found,
            Err(e) => {
                debug!(workflow_id = %workflow_id, reason = %e, "Nothing to cancel");
                return CancelOutcome { cancelled: false };
            }
        };

        let terminations = agents.iter().map(|(role, agent_id)| {
            let gateway = self.gateway.clone();
            let workspace_id = workspace_id.as_str();
            async move {
                if let Err(e) = gateway.terminate_agent(*agent_id, workspace_id).await {
                    warn!(
                        workflow_id = %workflow_id,
                        agent_id = %agent_id,
                        agent_type = %role,
                        error = %e,
                        "Failed to terminate agent during cancellation"
                    );
                }
            }
        });
        join_all(terminations).await;

        self.events.publish(workflow_event(
            WorkflowEventKind::WorkflowFailed,
            workflow_id,
            json!({ "reason": CANCELLED_ERROR }),
        ));
        info!(
            workflow_id = %workflow_id,
            terminated_agents = agents.len(),
            "Workflow cancelled"
        );
        CancelOutcome { cancelled: true }
    }
}

impl std::fmt::Debug for CancellationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationController")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        OrchestratorTask, PhaseName, WorkflowPhase, WorkflowState, DEFAULT_MAX_RETRIES,
    };
    use crate::infrastructure::memory::{AgentScript, ScriptedAgents};

    async fn setup(script: AgentScript) -> (CancellationController, Arc<ScriptedAgents>, WorkflowStore) {
        let agents = Arc::new(ScriptedAgents::new(script));
        let store = WorkflowStore::new();
        let controller =
            CancellationController::new(agents.clone(), store.clone(), Arc::new(EventBus::default()));
        (controller, agents, store)
    }

    async fn workflow_with_two_agents(store: &WorkflowStore) -> Uuid {
        let task = OrchestratorTask::new("t-1", "implement-feature", "Add search", "ws-1", "u-1");
        let state = WorkflowState::new(&task, DEFAULT_MAX_RETRIES);
        let id = state.id;
        store.insert(state).await;
        store
            .update(id, |s| {
                s.record_agent(AgentRole::Planner, Uuid::new_v4(), PhaseName::Planning)?;
                s.record_agent(AgentRole::Dev, Uuid::new_v4(), PhaseName::Implementation)
            })
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_unknown_workflow() {
        let (controller, agents, _store) = setup(AgentScript::default()).await;
        assert!(!controller.cancel(Uuid::new_v4()).await.cancelled);
        assert_eq!(agents.counts().terminations, 0);
    }

    #[tokio::test]
    async fn test_cancel_survives_termination_failures() {
        let script = AgentScript {
            fail_terminations: true,
            ..AgentScript::default()
        };
        let (controller, agents, store) = setup(script).await;
        let id = workflow_with_two_agents(&store).await;

        assert!(controller.cancel(id).await.cancelled);
        assert_eq!(agents.counts().terminations, 2);

        let state = store.get(id).await.unwrap();
        assert_eq!(state.phase, WorkflowPhase::Failed);
        assert_eq!(state.error.as_deref(), Some(CANCELLED_ERROR));
    }

    #[tokio::test]
    async fn test_terminal_workflow_is_left_alone() {
        let (controller, agents, store) = setup(AgentScript::default()).await;
        let id = workflow_with_two_agents(&store).await;
        store.update(id, |s| s.complete()).await.unwrap();

        assert!(!controller.cancel(id).await.cancelled);
        assert_eq!(agents.counts().terminations, 0);
        assert_eq!(store.get(id).await.unwrap().phase, WorkflowPhase::Completed);
    }
}
