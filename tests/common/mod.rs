//! Common test utilities for integration tests
//!
//! Provides an orchestrator wired to the scripted in-process agents, plus
//! polling and event helpers shared across the integration test files.

use std::sync::Arc;
use std::time::Duration;

use convoy::domain::models::{Config, OrchestratorTask};
use convoy::domain::ports::AgentExecutors;
use convoy::infrastructure::memory::{AgentScript, InMemoryContextStore, ScriptedAgents};
use convoy::services::{WorkflowEvent, WorkflowOrchestrator};
use tokio::sync::broadcast;

/// An orchestrator together with the adapters it was built from.
#[allow(dead_code)]
pub struct Harness {
    pub orchestrator: WorkflowOrchestrator,
    pub agents: Arc<ScriptedAgents>,
    pub checkpoints: Arc<InMemoryContextStore>,
}

/// Build a harness with default configuration.
#[allow(dead_code)]
pub fn harness(script: AgentScript) -> Harness {
    harness_with_config(script, &Config::default())
}

#[allow(dead_code)]
pub fn harness_with_config(script: AgentScript, config: &Config) -> Harness {
    let agents = Arc::new(ScriptedAgents::new(script));
    let checkpoints = Arc::new(InMemoryContextStore::new());
    let orchestrator = WorkflowOrchestrator::from_config(
        agents.clone(),
        AgentExecutors::from_shared(agents.clone()),
        checkpoints.clone(),
        config,
    );
    Harness {
        orchestrator,
        agents,
        checkpoints,
    }
}

/// A task in workspace `ws-1` submitted by `u-1`.
#[allow(dead_code)]
pub fn task(id: &str, task_type: &str) -> OrchestratorTask {
    OrchestratorTask::new(id, task_type, format!("{task_type} task {id}"), "ws-1", "u-1")
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Drain every event currently buffered on `rx`.
#[allow(dead_code)]
pub fn drain(rx: &mut broadcast::Receiver<WorkflowEvent>) -> Vec<WorkflowEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Dotted event names, in order.
#[allow(dead_code)]
pub fn names(events: &[WorkflowEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.kind.as_str()).collect()
}

/// Poll an async condition every 10ms until it holds or `timeout` elapses.
#[allow(dead_code)]
pub async fn wait_until<F, Fut>(mut predicate: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if predicate().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
