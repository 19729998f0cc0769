//! Scripted in-process agents.
//!
//! A deterministic implementation of the agent gateway and all four role
//! executors. Outcomes come from an [`AgentScript`]; every call is counted so
//! callers can assert on invocation patterns.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map};
use tokio::sync::{Notify, RwLock};
use uuid::Uuid;

use crate::domain::errors::AgentError;
use crate::domain::models::{
    Agent, AgentPage, AgentRole, AgentStatus, CreateAgentRequest, DevOpsResult, DevOpsTask,
    DevResult, DevStatus, DevTask, PlanResult, PlanStatus, PlannerTask, QaResult, QaStatus,
    QaTask, TestResults,
};
use crate::domain::ports::{
    AgentGateway, DevExecutor, DevOpsExecutor, PlannerExecutor, QaExecutor,
};

/// How the scripted agents behave.
#[derive(Debug, Clone)]
pub struct AgentScript {
    /// QA runs that report failures before the first passing run.
    pub qa_failures_before_pass: u32,
    /// Smoke-test outcome reported by every deployment.
    pub smoke_tests_pass: bool,
    /// Whether a rollback reports `rollback_completed` or `rollback_failed`.
    pub rollback_succeeds: bool,
    /// Role whose every task call errors, with the error message.
    pub failing_role: Option<(AgentRole, String)>,
    /// Make every termination call error.
    pub fail_terminations: bool,
}

impl Default for AgentScript {
    fn default() -> Self {
        Self {
            qa_failures_before_pass: 0,
            smoke_tests_pass: true,
            rollback_succeeds: true,
            failing_role: None,
            fail_terminations: false,
        }
    }
}

impl AgentScript {
    /// QA never passes.
    pub fn qa_always_failing() -> Self {
        Self {
            qa_failures_before_pass: u32::MAX,
            ..Self::default()
        }
    }

    pub fn with_qa_failures(mut self, failures: u32) -> Self {
        self.qa_failures_before_pass = failures;
        self
    }

    pub fn with_smoke_failure(mut self) -> Self {
        self.smoke_tests_pass = false;
        self
    }

    pub fn with_failing_role(mut self, role: AgentRole, message: impl Into<String>) -> Self {
        self.failing_role = Some((role, message.into()));
        self
    }
}

/// Snapshot of invocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationCounts {
    pub created: u32,
    pub planner: u32,
    pub dev: u32,
    pub qa: u32,
    pub deploy: u32,
    pub rollback: u32,
    /// Termination calls, including those that errored.
    pub terminations: u32,
}

#[derive(Debug, Default)]
struct Counters {
    created: AtomicU32,
    planner: AtomicU32,
    dev: AtomicU32,
    qa: AtomicU32,
    deploy: AtomicU32,
    rollback: AtomicU32,
    terminations: AtomicU32,
}

impl Counters {
    fn bump(counter: &AtomicU32) -> u32 {
        counter.fetch_add(1, Ordering::AcqRel)
    }

    fn snapshot(&self) -> InvocationCounts {
        InvocationCounts {
            created: self.created.load(Ordering::Acquire),
            planner: self.planner.load(Ordering::Acquire),
            dev: self.dev.load(Ordering::Acquire),
            qa: self.qa.load(Ordering::Acquire),
            deploy: self.deploy.load(Ordering::Acquire),
            rollback: self.rollback.load(Ordering::Acquire),
            terminations: self.terminations.load(Ordering::Acquire),
        }
    }
}

/// Deterministic agent gateway and executors.
#[derive(Debug)]
pub struct ScriptedAgents {
    script: AgentScript,
    agents: RwLock<HashMap<Uuid, Agent>>,
    counters: Counters,
    holds: RwLock<HashMap<AgentRole, Arc<Notify>>>,
    creation_holds: RwLock<HashMap<AgentRole, Arc<Notify>>>,
}

impl ScriptedAgents {
    pub fn new(script: AgentScript) -> Self {
        Self {
            script,
            agents: RwLock::new(HashMap::new()),
            counters: Counters::default(),
            holds: RwLock::new(HashMap::new()),
            creation_holds: RwLock::new(HashMap::new()),
        }
    }

    pub fn script(&self) -> &AgentScript {
        &self.script
    }

    pub fn counts(&self) -> InvocationCounts {
        self.counters.snapshot()
    }

    /// Every agent created so far, oldest first.
    pub async fn agents(&self) -> Vec<Agent> {
        let mut agents: Vec<Agent> = self.agents.read().await.values().cloned().collect();
        agents.sort_by_key(|a| a.created_at);
        agents
    }

    /// Block task calls for `role` until the returned handle is notified.
    pub async fn hold(&self, role: AgentRole) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.holds.write().await.insert(role, notify.clone());
        notify
    }

    /// Block `create_agent` for `role` until the returned handle is notified.
    ///
    /// The call is counted in `created` before it blocks.
    pub async fn hold_creation(&self, role: AgentRole) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.creation_holds.write().await.insert(role, notify.clone());
        notify
    }

    /// Shared preamble of every task call: wait on a hold, then apply the failing role.
    async fn begin(&self, agent: &Agent) -> Result<(), AgentError> {
        let hold = self.holds.read().await.get(&agent.role).cloned();
        if let Some(hold) = hold {
            hold.notified().await;
        }
        self.set_status(agent.id, AgentStatus::Busy).await;
        match &self.script.failing_role {
            Some((role, message)) if *role == agent.role => {
                self.set_status(agent.id, AgentStatus::Failed).await;
                Err(AgentError::Execution(message.clone()))
            }
            _ => Ok(()),
        }
    }

    async fn finish(&self, agent: &Agent) {
        self.set_status(agent.id, AgentStatus::Completed).await;
    }

    async fn set_status(&self, id: Uuid, status: AgentStatus) {
        if let Some(agent) = self.agents.write().await.get_mut(&id) {
            if agent.status != AgentStatus::Terminated {
                agent.status = status;
            }
        }
    }
}

impl Default for ScriptedAgents {
    fn default() -> Self {
        Self::new(AgentScript::default())
    }
}

#[async_trait]
impl AgentGateway for ScriptedAgents {
    async fn create_agent(&self, request: CreateAgentRequest) -> Result<Agent, AgentError> {
        Counters::bump(&self.counters.created);
        let hold = self.creation_holds.read().await.get(&request.role).cloned();
        if let Some(hold) = hold {
            hold.notified().await;
        }
        let agent = Agent::from_request(&request);
        self.agents.write().await.insert(agent.id, agent.clone());
        Ok(agent)
    }

    async fn get_agent(&self, id: Uuid, workspace_id: &str) -> Result<Option<Agent>, AgentError> {
        Ok(self
            .agents
            .read()
            .await
            .get(&id)
            .filter(|a| a.workspace_id == workspace_id)
            .cloned())
    }

    async fn list_agents(&self, workspace_id: &str, limit: usize) -> Result<AgentPage, AgentError> {
        let mut agents: Vec<Agent> = self
            .agents
            .read()
            .await
            .values()
            .filter(|a| a.workspace_id == workspace_id)
            .cloned()
            .collect();
        agents.sort_by_key(|a| a.created_at);
        let total = agents.len();
        agents.truncate(limit);
        Ok(AgentPage { agents, total })
    }

    async fn terminate_agent(&self, id: Uuid, workspace_id: &str) -> Result<(), AgentError> {
        Counters::bump(&self.counters.terminations);
        if self.script.fail_terminations {
            return Err(AgentError::Unavailable("termination endpoint down".to_string()));
        }
        let mut agents = self.agents.write().await;
        match agents.get_mut(&id).filter(|a| a.workspace_id == workspace_id) {
            Some(agent) => {
                agent.terminate();
                Ok(())
            }
            None => Err(AgentError::NotFound(id)),
        }
    }
}

#[async_trait]
impl PlannerExecutor for ScriptedAgents {
    async fn execute_task(&self, agent: &Agent, task: PlannerTask) -> Result<PlanResult, AgentError> {
        Counters::bump(&self.counters.planner);
        self.begin(agent).await?;
        let PlannerTask::CreatePlan { description, .. } = task;
        self.finish(agent).await;
        Ok(PlanResult {
            status: PlanStatus::PlanCreated,
            stories: vec![json!({ "title": description, "points": 3 })],
            extra: Map::new(),
        })
    }
}

#[async_trait]
impl DevExecutor for ScriptedAgents {
    async fn execute_task(&self, agent: &Agent, task: DevTask) -> Result<DevResult, AgentError> {
        Counters::bump(&self.counters.dev);
        self.begin(agent).await?;
        let result = match task {
            DevTask::ImplementStory { .. } => DevResult {
                status: DevStatus::Implemented,
                files_generated: vec!["src/feature.rs".to_string()],
                files_modified: vec!["src/lib.rs".to_string()],
                extra: Map::new(),
            },
            DevTask::FixBug { .. } => DevResult {
                status: DevStatus::Fixed,
                files_generated: Vec::new(),
                files_modified: vec!["src/fix.rs".to_string()],
                extra: Map::new(),
            },
        };
        self.finish(agent).await;
        Ok(result)
    }
}

#[async_trait]
impl QaExecutor for ScriptedAgents {
    async fn execute_task(&self, agent: &Agent, task: QaTask) -> Result<QaResult, AgentError> {
        let run = Counters::bump(&self.counters.qa);
        self.begin(agent).await?;
        let QaTask::RunTests { files } = task;
        let total = u32::try_from(files.len().max(1) * 5).unwrap_or(u32::MAX);
        let failed = if run < self.script.qa_failures_before_pass {
            2.min(total)
        } else {
            0
        };
        self.finish(agent).await;
        Ok(QaResult {
            status: if failed == 0 { QaStatus::Passed } else { QaStatus::Failed },
            test_results: TestResults {
                total,
                passed: total - failed,
                failed,
            },
            extra: Map::new(),
        })
    }
}

#[async_trait]
impl DevOpsExecutor for ScriptedAgents {
    async fn execute_task(&self, agent: &Agent, task: DevOpsTask) -> Result<DevOpsResult, AgentError> {
        let result = match task {
            DevOpsTask::Deploy { environment, .. } => {
                let n = Counters::bump(&self.counters.deploy);
                self.begin(agent).await?;
                DevOpsResult::Deployed {
                    deployment_id: format!("dep-{}", n + 1),
                    smoke_tests_passed: self.script.smoke_tests_pass,
                    url: Some(format!("https://{environment}.convoy.local")),
                }
            }
            DevOpsTask::Rollback { deployment_id, .. } => {
                Counters::bump(&self.counters.rollback);
                self.begin(agent).await?;
                if self.script.rollback_succeeds {
                    DevOpsResult::RollbackCompleted { deployment_id }
                } else {
                    DevOpsResult::RollbackFailed {
                        deployment_id,
                        reason: "previous release artifact missing".to_string(),
                    }
                }
            }
        };
        self.finish(agent).await;
        Ok(result)
    }
}
