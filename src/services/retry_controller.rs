//! Implementation/QA retry loop.
//!
//! QA always verifies the implementation that ran immediately before it. A QA
//! run reporting failures consumes one retry; once `retry_count` exceeds
//! `max_retries` the loop gives up. Errors raised by either agent are not
//! retried and surface as [`PhaseFailure::Agent`].

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::phase_executor::{PhaseExecutor, PhaseFailure, PhaseSpec, RunContext};
use super::workflow_store::WorkflowStore;
use crate::domain::models::{AgentRequest, DevTask, PhaseName, QaTask};

/// What the loop verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationKind {
    /// A story implemented from a plan.
    Feature,
    /// A bug fix.
    BugFix,
}

impl VerificationKind {
    /// Error recorded when the retry budget runs out.
    pub fn exhausted_message(self, max_retries: u32) -> String {
        match self {
            Self::Feature => format!("QA failed after {max_retries} retries"),
            Self::BugFix => format!("QA verification failed after {max_retries} retries"),
        }
    }
}

/// How the loop ended, when no agent errored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// QA reported zero failures on attempt `attempts`.
    Passed { attempts: u32 },
    /// The retry budget is spent.
    Exhausted { error: String },
}

#[derive(Debug, Clone)]
pub struct RetryController {
    executor: PhaseExecutor,
    store: WorkflowStore,
}

impl RetryController {
    pub fn new(executor: PhaseExecutor, store: WorkflowStore) -> Self {
        Self { executor, store }
    }

    /// Run implementation then QA until QA passes or retries are exhausted.
    ///
    /// `plan` is the planning result forwarded to a feature's dev agent.
    #[instrument(skip(self, ctx, description, plan), fields(workflow_id = %ctx.workflow_id))]
    pub async fn run(
        &self,
        ctx: &RunContext,
        kind: VerificationKind,
        description: &str,
        plan: Option<Value>,
    ) -> Result<LoopOutcome, PhaseFailure> {
        let mut attempts: u32 = 1;
        let mut retry: Option<(u32, Option<Value>)> = None;

        loop {
            let implementation = self
                .executor
                .run(ctx, Self::implementation_spec(kind, description, plan.as_ref(), retry.take()))
                .await?;

            let files = implementation
                .as_dev()
                .map(|dev| dev.files_for_review())
                .unwrap_or_default();
            let qa = self
                .executor
                .run(
                    ctx,
                    PhaseSpec::new(
                        PhaseName::Qa,
                        AgentRequest::Qa(QaTask::RunTests { files }),
                        json!({ "implementation": implementation.to_value() }),
                    ),
                )
                .await?;

            if qa.as_qa().is_some_and(|r| r.passed()) {
                return Ok(LoopOutcome::Passed { attempts });
            }

            let failed_tests = qa.as_qa().map_or(0, |r| r.test_results.failed);
            let (retry_count, exhausted, max_retries) = self
                .store
                .update(ctx.workflow_id, |s| {
                    let count = s.increment_retry()?;
                    Ok((count, s.retries_exhausted(), s.max_retries))
                })
                .await
                .map_err(|_| PhaseFailure::Halted { phase: PhaseName::Qa })?;

            if exhausted {
                warn!(
                    workflow_id = %ctx.workflow_id,
                    retry_count,
                    max_retries,
                    failed_tests,
                    "QA retry budget exhausted"
                );
                return Ok(LoopOutcome::Exhausted {
                    error: kind.exhausted_message(max_retries),
                });
            }

            info!(
                workflow_id = %ctx.workflow_id,
                retry_count,
                max_retries,
                failed_tests,
                "QA reported failures, retrying implementation"
            );
            let recovered = self
                .executor
                .recover_context(ctx.workflow_id, PhaseName::Implementation)
                .await;
            retry = Some((retry_count, recovered));
            attempts += 1;
        }
    }

    fn implementation_spec(
        kind: VerificationKind,
        description: &str,
        plan: Option<&Value>,
        retry: Option<(u32, Option<Value>)>,
    ) -> PhaseSpec {
        let (request, mut config) = match kind {
            VerificationKind::Feature => (
                AgentRequest::Dev(DevTask::ImplementStory {
                    description: description.to_string(),
                    plan: plan.cloned(),
                }),
                json!({ "plan": plan.cloned().unwrap_or(Value::Null) }),
            ),
            VerificationKind::BugFix => (
                AgentRequest::Dev(DevTask::FixBug {
                    description: description.to_string(),
                }),
                json!({}),
            ),
        };

        if let (Some((attempt, recovered)), Some(map)) = (retry, config.as_object_mut()) {
            map.insert("attempt".to_string(), json!(attempt));
            map.insert(
                "recoveredContext".to_string(),
                recovered.unwrap_or(Value::Null),
            );
        }

        PhaseSpec::new(PhaseName::Implementation, request, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::models::{
        AgentRole, OrchestratorTask, WorkflowPhase, WorkflowState, CONFIG_MAX_RETRIES,
        DEFAULT_MAX_RETRIES,
    };
    use crate::domain::ports::AgentExecutors;
    use crate::infrastructure::memory::{AgentScript, InMemoryContextStore, ScriptedAgents};
    use crate::services::event_bus::EventBus;

    async fn setup(
        script: AgentScript,
        max_retries: u32,
    ) -> (RetryController, Arc<ScriptedAgents>, WorkflowStore, RunContext) {
        let agents = Arc::new(ScriptedAgents::new(script));
        let store = WorkflowStore::new();
        let task = OrchestratorTask::new("t-1", "fix-bug", "Fix crash", "ws-1", "user-1")
            .with_config(CONFIG_MAX_RETRIES, json!(max_retries));
        let state = WorkflowState::new(&task, DEFAULT_MAX_RETRIES);
        let ctx = RunContext::new(&state, "user-1");
        store.insert(state).await;
        let executor = PhaseExecutor::new(
            agents.clone(),
            AgentExecutors::from_shared(agents.clone()),
            Arc::new(InMemoryContextStore::new()),
            store.clone(),
            Arc::new(EventBus::default()),
        );
        (RetryController::new(executor, store.clone()), agents, store, ctx)
    }

    #[test]
    fn test_exhausted_messages() {
        assert_eq!(
            VerificationKind::Feature.exhausted_message(2),
            "QA failed after 2 retries"
        );
        assert!(VerificationKind::BugFix
            .exhausted_message(0)
            .contains("QA verification failed"));
    }

    #[test]
    fn test_retry_spec_forwards_recovered_context() {
        let spec = RetryController::implementation_spec(
            VerificationKind::Feature,
            "Add search",
            Some(&json!({"stories": []})),
            Some((1, Some(json!({"status": "implemented"})))),
        );
        assert_eq!(spec.agent_config["attempt"], 1);
        assert_eq!(spec.agent_config["recoveredContext"]["status"], "implemented");
        assert_eq!(spec.agent_config["plan"], json!({"stories": []}));
    }

    #[tokio::test]
    async fn test_passes_after_one_failure() {
        let (controller, agents, store, ctx) =
            setup(AgentScript::default().with_qa_failures(1), 2).await;

        let outcome = controller
            .run(&ctx, VerificationKind::BugFix, "Fix crash", None)
            .await
            .unwrap();
        assert_eq!(outcome, LoopOutcome::Passed { attempts: 2 });

        let counts = agents.counts();
        assert_eq!((counts.dev, counts.qa), (2, 2));
        let state = store.get(ctx.workflow_id).await.unwrap();
        assert_eq!(state.retry_count, 1);
        assert_eq!(state.phase, WorkflowPhase::Qa);

        let retried = agents
            .agents()
            .await
            .into_iter()
            .filter(|a| a.role == AgentRole::Dev)
            .nth(1)
            .unwrap();
        assert_eq!(retried.config["attempt"], 1);
        assert_eq!(retried.config["recoveredContext"]["status"], "fixed");
    }

    #[tokio::test]
    async fn test_exhaustion_runs_budget_plus_one() {
        let (controller, agents, _store, ctx) = setup(AgentScript::qa_always_failing(), 3).await;

        let outcome = controller
            .run(&ctx, VerificationKind::Feature, "Add search", None)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LoopOutcome::Exhausted {
                error: "QA failed after 3 retries".to_string()
            }
        );
        let counts = agents.counts();
        assert_eq!((counts.dev, counts.qa), (4, 4));
    }

    #[tokio::test]
    async fn test_agent_error_is_not_retried() {
        let (controller, agents, store, ctx) = setup(
            AgentScript::default().with_failing_role(AgentRole::Qa, "QA runner crashed"),
            2,
        )
        .await;

        let failure = controller
            .run(&ctx, VerificationKind::BugFix, "Fix crash", None)
            .await
            .unwrap_err();
        assert_eq!(
            failure,
            PhaseFailure::Agent {
                phase: PhaseName::Qa,
                message: "QA runner crashed".to_string()
            }
        );
        assert_eq!(agents.counts().dev, 1);
        assert_eq!(store.get(ctx.workflow_id).await.unwrap().retry_count, 0);
    }
}
