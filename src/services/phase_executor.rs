//! Phase Executor service.
//!
//! Runs exactly one phase of one workflow: spawns the agent, invokes its
//! task, records the result on the workflow, checkpoints context and emits
//! lifecycle events along the way.
//!
//! Every state mutation goes through [`WorkflowStore::update`]. If the
//! workflow turned terminal underneath the phase (a cancellation raced the
//! agent call), the phase stops with [`PhaseFailure::Halted`] and records nothing.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::approval_gate::ApprovalGate;
use super::event_bus::{EventBus, WorkflowEventKind};
use super::event_factory::{agent_event, phase_event};
use super::workflow_store::WorkflowStore;
use crate::domain::errors::{AgentError, DomainError};
use crate::domain::models::{
    Agent, AgentRequest, CreateAgentRequest, PhaseName, PhaseResult, WorkflowState,
};
use crate::domain::ports::{
    checkpoint_key, AgentExecutors, AgentGateway, ContextCheckpointStore, ContextSnapshot,
};

/// Identity of the workflow a phase runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub workflow_id: Uuid,
    pub workspace_id: String,
    /// User agents are created on behalf of.
    pub user_id: String,
}

impl RunContext {
    pub fn new(state: &WorkflowState, user_id: impl Into<String>) -> Self {
        Self {
            workflow_id: state.id,
            workspace_id: state.workspace_id.clone(),
            user_id: user_id.into(),
        }
    }
}

/// One phase to execute.
#[derive(Debug, Clone)]
pub struct PhaseSpec {
    pub phase: PhaseName,
    pub request: AgentRequest,
    /// Configuration forwarded to the agent at creation time.
    pub agent_config: Value,
}

impl PhaseSpec {
    pub fn new(phase: PhaseName, request: AgentRequest, agent_config: Value) -> Self {
        Self {
            phase,
            request,
            agent_config,
        }
    }
}

/// Why a phase did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseFailure {
    /// The gateway or the agent failed. Terminal for the workflow.
    Agent { phase: PhaseName, message: String },
    /// The workflow became terminal (or vanished) while the phase was running.
    Halted { phase: PhaseName },
}

impl PhaseFailure {
    pub fn phase(&self) -> PhaseName {
        match self {
            Self::Agent { phase, .. } | Self::Halted { phase } => *phase,
        }
    }
}

/// Executes single phases against the agent gateway.
#[derive(Clone)]
pub struct PhaseExecutor {
    gateway: Arc<dyn AgentGateway>,
    executors: AgentExecutors,
    checkpoints: Arc<dyn ContextCheckpointStore>,
    store: WorkflowStore,
    events: Arc<EventBus>,
}

impl PhaseExecutor {
    pub fn new(
        gateway: Arc<dyn AgentGateway>,
        executors: AgentExecutors,
        checkpoints: Arc<dyn ContextCheckpointStore>,
        store: WorkflowStore,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            gateway,
            executors,
            checkpoints,
            store,
            events,
        }
    }

    /// Run one phase to completion.
    pub async fn run(&self, ctx: &RunContext, spec: PhaseSpec) -> Result<PhaseResult, PhaseFailure> {
        let PhaseSpec {
            phase,
            request,
            agent_config,
        } = spec;
        let workflow_id = ctx.workflow_id;
        let role = request.role();
        let halted = |_: DomainError| PhaseFailure::Halted { phase };

        self.store
            .update(workflow_id, |s| {
                s.advance_to(phase.workflow_phase())?;
                Ok(ApprovalGate::apply(s, phase))
            })
            .await
            .map_err(halted)?;

        self.events.publish(phase_event(
            WorkflowEventKind::PhaseStarted,
            workflow_id,
            phase,
            json!({ "agentType": role }),
        ));

        let agent = match self
            .gateway
            .create_agent(CreateAgentRequest {
                role,
                workspace_id: ctx.workspace_id.clone(),
                created_by: ctx.user_id.clone(),
                config: agent_config,
            })
            .await
        {
            Ok(agent) => agent,
            Err(e) => return Err(self.phase_failed(workflow_id, phase, None, &e)),
        };

        let recorded = self
            .store
            .update(workflow_id, |s| s.record_agent(role, agent.id, phase))
            .await;
        if let Err(e) = recorded {
            self.release_orphan(&agent, &e).await;
            return Err(PhaseFailure::Halted { phase });
        }

        debug!(
            workflow_id = %workflow_id,
            phase = %phase,
            agent_id = %agent.id,
            agent_type = %role,
            "Agent spawned"
        );
        self.events.publish(agent_event(
            WorkflowEventKind::AgentSpawned,
            workflow_id,
            phase,
            &agent,
        ));

        let result = match self.dispatch(&agent, request).await {
            Ok(result) => result,
            Err(e) => return Err(self.phase_failed(workflow_id, phase, Some(&agent), &e)),
        };

        self.store
            .update(workflow_id, |s| s.record_phase_result(phase, result.clone()))
            .await
            .map_err(halted)?;

        self.events.publish(agent_event(
            WorkflowEventKind::AgentCompleted,
            workflow_id,
            phase,
            &agent,
        ));
        self.events.publish(phase_event(
            WorkflowEventKind::PhaseCompleted,
            workflow_id,
            phase,
            json!({ "status": result.to_value().get("status").cloned().unwrap_or(Value::Null) }),
        ));

        self.checkpoint(workflow_id, phase, &result).await;

        info!(workflow_id = %workflow_id, phase = %phase, "Phase completed");
        Ok(result)
    }

    /// Recover the checkpointed context of `phase`, or `None` on absence or error.
    pub async fn recover_context(&self, workflow_id: Uuid, phase: PhaseName) -> Option<Value> {
        let key = checkpoint_key(workflow_id, phase);
        match self.checkpoints.recover_context(&key).await {
            Ok(snapshot) => snapshot.map(|s| s.result),
            Err(e) => {
                warn!(
                    workflow_id = %workflow_id,
                    phase = %phase,
                    error = %e,
                    "Context recovery failed, retrying without it"
                );
                None
            }
        }
    }

    async fn dispatch(&self, agent: &Agent, request: AgentRequest) -> Result<PhaseResult, AgentError> {
        match request {
            AgentRequest::Planner(task) => self
                .executors
                .planner
                .execute_task(agent, task)
                .await
                .map(PhaseResult::Plan),
            AgentRequest::Dev(task) => self
                .executors
                .dev
                .execute_task(agent, task)
                .await
                .map(PhaseResult::Implementation),
            AgentRequest::Qa(task) => self
                .executors
                .qa
                .execute_task(agent, task)
                .await
                .map(PhaseResult::Qa),
            AgentRequest::DevOps(task) => self
                .executors
                .devops
                .execute_task(agent, task)
                .await
                .map(PhaseResult::DevOps),
        }
    }

    async fn checkpoint(&self, workflow_id: Uuid, phase: PhaseName, result: &PhaseResult) {
        let key = checkpoint_key(workflow_id, phase);
        let snapshot = ContextSnapshot {
            phase,
            result: result.to_value(),
        };
        if let Err(e) = self.checkpoints.save_context(&key, snapshot).await {
            warn!(
                workflow_id = %workflow_id,
                phase = %phase,
                error = %e,
                "Context checkpoint failed"
            );
        }
    }

    fn phase_failed(
        &self,
        workflow_id: Uuid,
        phase: PhaseName,
        agent: Option<&Agent>,
        error: &AgentError,
    ) -> PhaseFailure {
        let message = error.to_string();
        warn!(
            workflow_id = %workflow_id,
            phase = %phase,
            error = %message,
            "Phase failed"
        );
        self.events.publish(phase_event(
            WorkflowEventKind::PhaseFailed,
            workflow_id,
            phase,
            json!({
                "error": message,
                "agentId": agent.map(|a| a.id),
            }),
        ));
        PhaseFailure::Agent { phase, message }
    }

    /// Terminate an agent spawned for a workflow that is already terminal.
    async fn release_orphan(&self, agent: &Agent, cause: &DomainError) {
        info!(
            agent_id = %agent.id,
            reason = %cause,
            "Workflow ended while spawning agent; terminating it"
        );
        if let Err(e) = self
            .gateway
            .terminate_agent(agent.id, &agent.workspace_id)
            .await
        {
            warn!(agent_id = %agent.id, error = %e, "Failed to terminate orphaned agent");
        }
    }
}

impl std::fmt::Debug for PhaseExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseExecutor")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
