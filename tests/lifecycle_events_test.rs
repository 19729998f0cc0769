//! Lifecycle event ordering and payloads.

mod common;

use common::{drain, harness, names, task};
use convoy::domain::models::{AgentRole, PhaseName};
use convoy::infrastructure::memory::AgentScript;

#[tokio::test]
async fn test_deploy_event_sequence() {
    let h = harness(AgentScript::default());
    let mut rx = h.orchestrator.events().subscribe();

    let result = h.orchestrator.execute_task(&task("t-1", "deploy")).await.unwrap();
    let events = drain(&mut rx);

    assert_eq!(
        names(&events),
        vec![
            "workflow.started",
            "workflow.phase.started",
            "workflow.agent.spawned",
            "workflow.agent.completed",
            "workflow.phase.completed",
            "workflow.completed",
        ]
    );
    assert!(events
        .iter()
        .all(|e| e.workflow_id == result.workflow_state.id));
    assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
    assert_eq!(events[0].data["taskType"], "deploy");
    assert_eq!(events[1].phase, Some(PhaseName::Deployment));
    assert_eq!(events[1].data["agentType"], "devops");
    assert_eq!(events[4].data["status"], "deployed");
}

#[tokio::test]
async fn test_rollback_phase_emits_its_own_events() {
    let h = harness(AgentScript::default().with_smoke_failure());
    let mut rx = h.orchestrator.events().subscribe();

    h.orchestrator.execute_task(&task("t-1", "deploy")).await.unwrap();
    let events = drain(&mut rx);

    let rollback_started = events
        .iter()
        .filter(|e| e.kind.as_str() == "workflow.phase.started")
        .filter(|e| e.phase == Some(PhaseName::Rollback))
        .count();
    assert_eq!(rollback_started, 1);
    let last = events.last().unwrap();
    assert_eq!(last.kind.as_str(), "workflow.failed");
    assert!(last.data["error"]
        .as_str()
        .unwrap()
        .contains("smoke tests failed"));
}

#[tokio::test]
async fn test_agent_error_emits_phase_failed_before_workflow_failed() {
    let h = harness(AgentScript::default().with_failing_role(AgentRole::Qa, "runner crashed"));
    let mut rx = h.orchestrator.events().subscribe();

    h.orchestrator.execute_task(&task("t-1", "fix-bug")).await.unwrap();
    let events = drain(&mut rx);
    let names = names(&events);

    assert_eq!(
        &names[names.len() - 4..],
        &[
            "workflow.phase.started",
            "workflow.agent.spawned",
            "workflow.phase.failed",
            "workflow.failed",
        ]
    );
    let phase_failed = &events[events.len() - 2];
    assert_eq!(phase_failed.phase, Some(PhaseName::Qa));
    assert_eq!(phase_failed.data["error"], "runner crashed");
    assert!(phase_failed.data["agentId"].is_string());
    assert_eq!(events.last().unwrap().data["error"], "runner crashed");
}

#[tokio::test]
async fn test_retry_loop_repeats_phase_events() {
    let h = harness(AgentScript::default().with_qa_failures(1));
    let mut rx = h.orchestrator.events().subscribe();

    h.orchestrator.execute_task(&task("t-1", "fix-bug")).await.unwrap();
    let events = drain(&mut rx);

    let spawned = names(&events)
        .into_iter()
        .filter(|n| *n == "workflow.agent.spawned")
        .count();
    assert_eq!(spawned, 4);
    assert_eq!(events.last().unwrap().kind.as_str(), "workflow.completed");
}

#[tokio::test]
async fn test_publishing_without_subscribers_is_harmless() {
    let h = harness(AgentScript::default());
    assert_eq!(h.orchestrator.events().subscriber_count(), 0);

    let result = h.orchestrator.execute_task(&task("t-1", "deploy")).await.unwrap();
    assert_eq!(result.status.to_string(), "completed");
    assert!(h.orchestrator.events().current_sequence().0 > 0);
}
