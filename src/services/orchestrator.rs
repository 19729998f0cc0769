//! Workflow Orchestrator service.
//!
//! The public surface of the crate. `execute_task` routes a task, registers
//! its workflow and drives it phase by phase to a terminal state:
//!
//! ```text
//! implement-feature   planning → [implementation → qa]*
//! fix-bug             [implementation → qa]*
//! deploy              deployment (→ rollback)
//! full-lifecycle      planning → [implementation → qa]* → deployment (→ rollback)
//! custom              (no phases)
//! ```
//!
//! Only an unknown task type is reported as an `Err`. Every other failure is
//! recorded on the workflow and returned inside [`OrchestratorResult`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::agent_monitor::{AgentMonitor, AgentOverview};
use super::cancellation::{CancelOutcome, CancellationController};
use super::deployment_guard::{DeploymentGuard, DeploymentOutcome};
use super::event_bus::{EventBus, EventBusConfig, WorkflowEventKind};
use super::event_factory::workflow_event;
use super::phase_executor::{PhaseExecutor, PhaseFailure, PhaseSpec, RunContext};
use super::retention_sweeper::{RetentionSweeper, SweeperHandle};
use super::retry_controller::{LoopOutcome, RetryController, VerificationKind};
use super::workflow_router::{RoutePlan, WorkflowRouter};
use super::workflow_store::{RetentionPolicy, WorkflowStore};
use crate::domain::errors::{AgentError, OrchestratorError};
use crate::domain::models::{
    AgentRequest, AgentRole, Config, OrchestratorConfig, OrchestratorTask, PhaseName, PhaseResult,
    PlannerTask, RetentionConfig, TaskType, WorkflowPhase, WorkflowState,
};
use crate::domain::ports::{AgentExecutors, AgentGateway, ContextCheckpointStore};

/// Final status reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of [`WorkflowOrchestrator::execute_task`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorResult {
    pub status: ResultStatus,
    pub workflow_state: WorkflowState,
    pub phase_results: BTreeMap<PhaseName, PhaseResult>,
    pub agents: BTreeMap<AgentRole, Uuid>,
}

impl OrchestratorResult {
    fn from_state(state: WorkflowState) -> Self {
        let status = if state.phase == WorkflowPhase::Completed {
            ResultStatus::Completed
        } else if state.was_cancelled() {
            ResultStatus::Cancelled
        } else {
            ResultStatus::Failed
        };
        Self {
            status,
            phase_results: state.phase_results.clone(),
            agents: state.agents.clone(),
            workflow_state: state,
        }
    }
}

/// How a pipeline ended before the terminal transition is applied.
enum PipelineEnd {
    Completed,
    Failed(String),
}

/// Drives workflows through their phases.
#[derive(Clone)]
pub struct WorkflowOrchestrator {
    executor: PhaseExecutor,
    retry: RetryController,
    deployment: DeploymentGuard,
    cancellation: CancellationController,
    monitor: AgentMonitor,
    store: WorkflowStore,
    events: Arc<EventBus>,
    config: OrchestratorConfig,
    sweep_interval: Duration,
}

impl WorkflowOrchestrator {
    pub fn new(
        gateway: Arc<dyn AgentGateway>,
        executors: AgentExecutors,
        checkpoints: Arc<dyn ContextCheckpointStore>,
        store: WorkflowStore,
        events: Arc<EventBus>,
        config: OrchestratorConfig,
    ) -> Self {
        let executor = PhaseExecutor::new(
            gateway.clone(),
            executors,
            checkpoints,
            store.clone(),
            events.clone(),
        );
        Self {
            retry: RetryController::new(executor.clone(), store.clone()),
            deployment: DeploymentGuard::new(executor.clone()),
            cancellation: CancellationController::new(gateway.clone(), store.clone(), events.clone()),
            monitor: AgentMonitor::new(gateway, config.monitor_list_limit),
            executor,
            store,
            events,
            config,
            sweep_interval: Duration::from_secs(RetentionConfig::default().sweep_interval_secs),
        }
    }

    /// Interval used by [`Self::spawn_retention_sweeper`].
    pub fn with_sweep_interval(mut self, every: Duration) -> Self {
        self.sweep_interval = every;
        self
    }

    /// Build an orchestrator with a fresh store and event bus sized from `config`.
    pub fn from_config(
        gateway: Arc<dyn AgentGateway>,
        executors: AgentExecutors,
        checkpoints: Arc<dyn ContextCheckpointStore>,
        config: &Config,
    ) -> Self {
        let store = WorkflowStore::new().with_retention(RetentionPolicy::from(&config.retention));
        let events = Arc::new(EventBus::new(EventBusConfig::from(&config.events)));
        Self::new(
            gateway,
            executors,
            checkpoints,
            store,
            events,
            config.orchestrator.clone(),
        )
        .with_sweep_interval(Duration::from_secs(config.retention.sweep_interval_secs))
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Start evicting terminal workflows on the configured interval, if the
    /// store has a retention policy.
    pub fn spawn_retention_sweeper(&self) -> Option<SweeperHandle> {
        self.spawn_retention_sweeper_every(self.sweep_interval)
    }

    /// Like [`Self::spawn_retention_sweeper`] with an explicit interval.
    pub fn spawn_retention_sweeper_every(&self, every: Duration) -> Option<SweeperHandle> {
        if self.store.retention().is_unbounded() {
            return None;
        }
        Some(RetentionSweeper::new(self.store.clone(), every).spawn())
    }

    /// Phases `task` would run, without side effects.
    pub fn plan(&self, task: &OrchestratorTask) -> Result<RoutePlan, OrchestratorError> {
        WorkflowRouter::plan(task)
    }

    /// Run a task to a terminal state.
    ///
    /// # Errors
    /// Only an unknown task type is returned as an error; no workflow is created for it.
    #[instrument(skip(self, task), fields(task_id = %task.id, task_type = %task.task_type))]
    pub async fn execute_task(
        &self,
        task: &OrchestratorTask,
    ) -> Result<OrchestratorResult, OrchestratorError> {
        let task_type = WorkflowRouter::route(task)?;
        let state = self.create_workflow_state(task).await;
        let workflow_id = state.id;
        let ctx = RunContext::new(&state, task.user_id.clone());

        info!(workflow_id = %workflow_id, workspace_id = %state.workspace_id, "Workflow started");
        self.events.publish(workflow_event(
            WorkflowEventKind::WorkflowStarted,
            workflow_id,
            json!({ "taskId": task.id, "taskType": task_type }),
        ));

        let end = self.run_pipeline(&ctx, task, task_type).await;
        let final_state = self.finish(workflow_id, end).await;
        Ok(OrchestratorResult::from_state(final_state.unwrap_or(state)))
    }

    /// Register a new workflow for `task` with configured defaults.
    pub async fn create_workflow_state(&self, task: &OrchestratorTask) -> WorkflowState {
        let state = WorkflowState::new(task, self.config.default_max_retries);
        self.store.insert(state.clone()).await;
        state
    }

    /// Current state of a workflow, or `None` if unknown.
    pub async fn get_workflow_status(&self, workflow_id: Uuid) -> Option<WorkflowState> {
        self.store.get(workflow_id).await
    }

    /// Non-terminal workflows of a workspace.
    pub async fn get_active_workflows(&self, workspace_id: &str) -> Vec<WorkflowState> {
        self.store.active_for_workspace(workspace_id).await
    }

    /// Most recent workflow started for a caller task id.
    pub async fn workflow_for_task(&self, task_id: &str) -> Option<WorkflowState> {
        self.store.find_by_task(task_id).await
    }

    pub async fn cancel_workflow(&self, workflow_id: Uuid) -> CancelOutcome {
        self.cancellation.cancel(workflow_id).await
    }

    pub async fn monitor_agents(&self, workspace_id: &str) -> Result<AgentOverview, AgentError> {
        self.monitor.overview(workspace_id).await
    }

    async fn run_pipeline(
        &self,
        ctx: &RunContext,
        task: &OrchestratorTask,
        task_type: TaskType,
    ) -> Result<PipelineEnd, PhaseFailure> {
        let plan = if WorkflowRouter::phase_sequence(task_type).contains(&PhaseName::Planning) {
            Some(self.run_planning(ctx, task).await?.to_value())
        } else {
            None
        };

        if let Some(kind) = WorkflowRouter::verification(task_type) {
            if let LoopOutcome::Exhausted { error } = self.verify(ctx, kind, task, plan).await? {
                return Ok(PipelineEnd::Failed(error));
            }
        }

        if WorkflowRouter::phase_sequence(task_type).contains(&PhaseName::Deployment) {
            let environment = task
                .environment()
                .unwrap_or(self.config.default_environment.as_str());
            let outcome = self
                .deployment
                .run(ctx, environment, task.project_id.clone())
                .await?;
            if let DeploymentOutcome::RolledBack { error, .. } = outcome {
                return Ok(PipelineEnd::Failed(error));
            }
        }

        Ok(PipelineEnd::Completed)
    }

    async fn run_planning(
        &self,
        ctx: &RunContext,
        task: &OrchestratorTask,
    ) -> Result<PhaseResult, PhaseFailure> {
        let sprint_id = task.sprint_id().cloned();
        let config = json!({
            "description": task.description,
            "projectId": task.project_id,
            "sprintId": sprint_id.clone().unwrap_or(Value::Null),
        });
        self.executor
            .run(
                ctx,
                PhaseSpec::new(
                    PhaseName::Planning,
                    AgentRequest::Planner(PlannerTask::CreatePlan {
                        description: task.description.clone(),
                        project_id: task.project_id.clone(),
                        sprint_id,
                    }),
                    config,
                ),
            )
            .await
    }

    async fn verify(
        &self,
        ctx: &RunContext,
        kind: VerificationKind,
        task: &OrchestratorTask,
        plan: Option<Value>,
    ) -> Result<LoopOutcome, PhaseFailure> {
        self.retry.run(ctx, kind, &task.description, plan).await
    }

    /// Apply the terminal transition for a pipeline result and emit its event.
    ///
    /// Nothing is applied if the workflow already turned terminal, which is
    /// how a cancellation during the last phase wins.
    async fn finish(
        &self,
        workflow_id: Uuid,
        end: Result<PipelineEnd, PhaseFailure>,
    ) -> Option<WorkflowState> {
        let failure = match end {
            Ok(PipelineEnd::Completed) => None,
            Ok(PipelineEnd::Failed(reason)) => Some(reason),
            Err(PhaseFailure::Agent { message, .. }) => Some(message),
            Err(PhaseFailure::Halted { phase }) => {
                info!(workflow_id = %workflow_id, phase = %phase, "Workflow halted after turning terminal");
                return self.store.get(workflow_id).await;
            }
        };

        match failure {
            None => {
                if self.store.update(workflow_id, |s| s.complete()).await.is_ok() {
                    info!(workflow_id = %workflow_id, "Workflow completed");
                    self.events.publish(workflow_event(
                        WorkflowEventKind::WorkflowCompleted,
                        workflow_id,
                        json!({}),
                    ));
                }
            }
            Some(reason) => {
                let applied = self
                    .store
                    .update(workflow_id, |s| s.fail(reason.clone()))
                    .await
                    .is_ok();
                if applied {
                    warn!(workflow_id = %workflow_id, error = %reason, "Workflow failed");
                    self.events.publish(workflow_event(
                        WorkflowEventKind::WorkflowFailed,
                        workflow_id,
                        json!({ "error": reason }),
                    ));
                }
            }
        }

        self.store.get(workflow_id).await
    }
}

impl std::fmt::Debug for WorkflowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowOrchestrator")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("sweep_interval", &self.sweep_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CONFIG_ENVIRONMENT, CONFIG_SPRINT_ID};
    use crate::infrastructure::memory::{AgentScript, InMemoryContextStore, ScriptedAgents};

    fn orchestrator(script: AgentScript) -> (WorkflowOrchestrator, Arc<ScriptedAgents>) {
        let agents = Arc::new(ScriptedAgents::new(script));
        let orchestrator = WorkflowOrchestrator::from_config(
            agents.clone(),
            AgentExecutors::from_shared(agents.clone()),
            Arc::new(InMemoryContextStore::new()),
            &Config::default(),
        );
        (orchestrator, agents)
    }

    #[tokio::test]
    async fn test_custom_completes_without_agents() {
        let (orchestrator, agents) = orchestrator(AgentScript::default());
        let task = OrchestratorTask::new("t-1", "custom", "external", "ws-1", "u-1");

        let result = orchestrator.execute_task(&task).await.unwrap();
        assert_eq!(result.status, ResultStatus::Completed);
        assert_eq!(result.workflow_state.phase, WorkflowPhase::Completed);
        assert!(result.workflow_state.completed_at.is_some());
        assert!(result.phase_results.is_empty());
        assert_eq!(agents.counts().created, 0);
    }

    #[tokio::test]
    async fn test_planner_receives_task_context() {
        let (orchestrator, agents) = orchestrator(AgentScript::default());
        let task = OrchestratorTask::new("t-1", "implement-feature", "Add search", "ws-1", "u-9")
            .with_project("proj-1")
            .with_config(CONFIG_SPRINT_ID, json!(12));

        let result = orchestrator.execute_task(&task).await.unwrap();
        assert_eq!(result.status, ResultStatus::Completed);

        let created = agents.agents().await;
        let planner = created.iter().find(|a| a.role == AgentRole::Planner).unwrap();
        assert_eq!(planner.created_by, "u-9");
        assert_eq!(planner.config["projectId"], "proj-1");
        assert_eq!(planner.config["sprintId"], 12);

        let dev = created.iter().find(|a| a.role == AgentRole::Dev).unwrap();
        assert_eq!(dev.config["plan"]["status"], "plan_created");
        let qa = created.iter().find(|a| a.role == AgentRole::Qa).unwrap();
        assert_eq!(qa.config["implementation"]["status"], "implemented");
    }

    #[tokio::test]
    async fn test_deploy_uses_default_environment() {
        let (orchestrator, agents) = orchestrator(AgentScript::default());
        let task = OrchestratorTask::new("t-1", "deploy", "Ship", "ws-1", "u-1");
        orchestrator.execute_task(&task).await.unwrap();
        let created = agents.agents().await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].config["environment"], "staging");

        let task = task.with_config(CONFIG_ENVIRONMENT, json!("production"));
        orchestrator.execute_task(&task).await.unwrap();
        assert!(agents
            .agents()
            .await
            .iter()
            .any(|a| a.config["environment"] == "production"));
    }

    #[tokio::test]
    async fn test_retention_sweeper_only_when_bounded() {
        let (orchestrator, _agents) = orchestrator(AgentScript::default());
        assert!(orchestrator.spawn_retention_sweeper().is_none());
        assert!(orchestrator
            .spawn_retention_sweeper_every(Duration::from_secs(60))
            .is_none());
    }

    #[tokio::test]
    async fn test_retention_sweeper_uses_configured_interval() {
        let mut config = Config::default();
        config.retention.max_terminal_entries = Some(10);
        config.retention.sweep_interval_secs = 42;
        let agents = Arc::new(ScriptedAgents::new(AgentScript::default()));
        let orchestrator = WorkflowOrchestrator::from_config(
            agents.clone(),
            AgentExecutors::from_shared(agents),
            Arc::new(InMemoryContextStore::new()),
            &config,
        );
        assert_eq!(orchestrator.sweep_interval(), Duration::from_secs(42));

        let sweeper = orchestrator.spawn_retention_sweeper().unwrap();
        assert_eq!(sweeper.interval(), Duration::from_secs(42));
        sweeper.stop().await;
    }

    #[test]
    fn test_default_sweep_interval() {
        let (orchestrator, _agents) = orchestrator(AgentScript::default());
        assert_eq!(orchestrator.sweep_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_result_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ResultStatus::Cancelled).unwrap(),
            json!("cancelled")
        );
    }
}
