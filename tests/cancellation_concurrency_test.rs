//! Cancellation of in-flight workflows and concurrent execution.

mod common;

use std::time::Duration;

use futures::future::join_all;

use common::{drain, harness, harness_with_config, task, wait_until};
use convoy::domain::models::{AgentRole, AgentStatus, Config, WorkflowPhase, CANCELLED_ERROR};
use convoy::domain::ports::AgentGateway;
use convoy::infrastructure::memory::AgentScript;
use convoy::services::ResultStatus;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_cancel_mid_flight_stops_pipeline() {
    let h = harness(AgentScript::default());
    let release = h.agents.hold(AgentRole::Dev).await;

    let orchestrator = h.orchestrator.clone();
    let run = tokio::spawn(async move {
        orchestrator
            .execute_task(&task("t-1", "implement-feature"))
            .await
    });

    let orch = &h.orchestrator;
    let dev_spawned = wait_until(
        || async move {
            orch.workflow_for_task("t-1")
                .await
                .is_some_and(|s| s.agents.contains_key(&AgentRole::Dev))
        },
        WAIT,
    )
    .await;
    assert!(dev_spawned);

    let workflow_id = orch.workflow_for_task("t-1").await.unwrap().id;
    assert!(orch.cancel_workflow(workflow_id).await.cancelled);
    assert_eq!(h.agents.counts().terminations, 2);

    release.notify_one();
    let result = run.await.unwrap().unwrap();

    assert_eq!(result.status, ResultStatus::Cancelled);
    assert_eq!(result.workflow_state.phase, WorkflowPhase::Failed);
    assert_eq!(result.workflow_state.error.as_deref(), Some(CANCELLED_ERROR));
    assert_eq!(h.agents.counts().qa, 0);
    assert!(orch.get_active_workflows("ws-1").await.is_empty());
}

#[tokio::test]
async fn test_agent_spawned_after_cancel_is_recorded_and_terminated() {
    let h = harness(AgentScript::default());
    let release = h.agents.hold_creation(AgentRole::Dev).await;

    let orchestrator = h.orchestrator.clone();
    let run = tokio::spawn(async move { orchestrator.execute_task(&task("t-1", "fix-bug")).await });

    let agents = &h.agents;
    assert!(wait_until(|| async move { agents.counts().created == 1 }, WAIT).await);

    let orch = &h.orchestrator;
    let state = orch.workflow_for_task("t-1").await.unwrap();
    assert_eq!(state.phase, WorkflowPhase::Implementation);
    assert!(state.agents.is_empty());
    assert!(orch.cancel_workflow(state.id).await.cancelled);
    assert_eq!(h.agents.counts().terminations, 0);

    release.notify_one();
    let result = run.await.unwrap().unwrap();

    assert_eq!(result.status, ResultStatus::Cancelled);
    assert_eq!(result.workflow_state.error.as_deref(), Some(CANCELLED_ERROR));
    let history = &result.workflow_state.agent_history;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].agent_type, AgentRole::Dev);

    let counts = h.agents.counts();
    assert_eq!(counts.terminations, 1);
    assert_eq!(counts.dev, 0);
    assert_eq!(counts.qa, 0);
    let spawned = h.agents.get_agent(history[0].agent_id, "ws-1").await.unwrap().unwrap();
    assert_eq!(spawned.status, AgentStatus::Terminated);
}

#[tokio::test]
async fn test_cancel_emits_single_terminal_event() {
    let h = harness(AgentScript::default());
    let release = h.agents.hold(AgentRole::Planner).await;
    let mut rx = h.orchestrator.events().subscribe();

    let orchestrator = h.orchestrator.clone();
    let run = tokio::spawn(async move {
        orchestrator.execute_task(&task("t-1", "full-lifecycle")).await
    });

    let orch = &h.orchestrator;
    assert!(
        wait_until(
            || async move {
                orch.workflow_for_task("t-1")
                    .await
                    .is_some_and(|s| !s.agents.is_empty())
            },
            WAIT,
        )
        .await
    );
    let workflow_id = orch.workflow_for_task("t-1").await.unwrap().id;
    assert!(orch.cancel_workflow(workflow_id).await.cancelled);

    release.notify_one();
    let result = run.await.unwrap().unwrap();
    assert_eq!(result.status, ResultStatus::Cancelled);

    let failed: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| e.kind.as_str() == "workflow.failed")
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].data["reason"], CANCELLED_ERROR);
    assert_eq!(h.agents.counts().dev, 0);
}

#[tokio::test]
async fn test_cancel_twice_reports_once() {
    let h = harness(AgentScript::default());
    let state = h
        .orchestrator
        .create_workflow_state(&task("t-1", "deploy"))
        .await;

    let (first, second) = tokio::join!(
        h.orchestrator.cancel_workflow(state.id),
        h.orchestrator.cancel_workflow(state.id)
    );

    assert!(first.cancelled ^ second.cancelled);
    let stored = h.orchestrator.get_workflow_status(state.id).await.unwrap();
    assert!(stored.was_cancelled());
}

#[tokio::test]
async fn test_cancel_completed_workflow_is_refused() {
    let h = harness(AgentScript::default());
    let result = h.orchestrator.execute_task(&task("t-1", "deploy")).await.unwrap();

    let outcome = h.orchestrator.cancel_workflow(result.workflow_state.id).await;

    assert!(!outcome.cancelled);
    assert_eq!(h.agents.counts().terminations, 0);
    let stored = h
        .orchestrator
        .get_workflow_status(result.workflow_state.id)
        .await
        .unwrap();
    assert_eq!(stored.phase, WorkflowPhase::Completed);
}

#[tokio::test]
async fn test_concurrent_workflows_are_isolated() {
    let h = harness(AgentScript::default().with_qa_failures(1));
    let task_types = ["implement-feature", "fix-bug", "deploy", "full-lifecycle", "custom"];
    let tasks: Vec<_> = (0..10)
        .map(|i| task(&format!("t-{i}"), task_types[i % task_types.len()]))
        .collect();

    let results = join_all(tasks.iter().map(|t| h.orchestrator.execute_task(t))).await;

    let mut ids = std::collections::HashSet::new();
    for (task, result) in tasks.iter().zip(results) {
        let result = result.unwrap();
        assert!(ids.insert(result.workflow_state.id));
        assert_eq!(result.workflow_state.task_id, task.id);
        assert!(result.workflow_state.is_terminal());
    }
    assert_eq!(h.orchestrator.store().len().await, 10);
    assert!(h.orchestrator.get_active_workflows("ws-1").await.is_empty());
}

#[tokio::test]
async fn test_retention_sweeper_evicts_terminal_workflows() {
    let mut config = Config::default();
    config.retention.max_terminal_entries = Some(1);
    let h = harness_with_config(AgentScript::default(), &config);

    for i in 0..3 {
        h.orchestrator
            .execute_task(&task(&format!("t-{i}"), "custom"))
            .await
            .unwrap();
    }
    let pending = h
        .orchestrator
        .create_workflow_state(&task("t-pending", "deploy"))
        .await;

    let sweeper = h
        .orchestrator
        .spawn_retention_sweeper_every(Duration::from_millis(10))
        .unwrap();
    let store = h.orchestrator.store();
    assert!(wait_until(|| async move { store.len().await == 2 }, WAIT).await);
    let handle = &sweeper;
    assert!(wait_until(|| async move { handle.evicted_total() == 2 }, WAIT).await);
    sweeper.stop().await;

    assert!(h.orchestrator.get_workflow_status(pending.id).await.is_some());
    assert!(h.orchestrator.workflow_for_task("t-2").await.is_some());
    assert!(h.orchestrator.workflow_for_task("t-0").await.is_none());
}
