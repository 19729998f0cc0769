//! `convoy simulate`: run a task against scripted in-process agents.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use super::load_task;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{AgentRole, AgentSpawn, ApprovalRecord, PhaseName, PhaseResult};
use crate::domain::ports::{AgentExecutors, ContextCheckpointStore, NullContextStore};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::memory::{
    AgentScript, InMemoryContextStore, InvocationCounts, ScriptedAgents,
};
use crate::services::orchestrator::{ResultStatus, WorkflowOrchestrator};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Task file (YAML or JSON)
    pub task_file: PathBuf,

    /// QA runs that report failures before QA passes
    #[arg(long, default_value = "0")]
    pub qa_failures: u32,

    /// Make deployments report failed smoke tests
    #[arg(long)]
    pub smoke_fail: bool,

    /// Make rollbacks report `rollback_failed`
    #[arg(long)]
    pub rollback_fail: bool,

    /// Agent role whose task calls error (planner, dev, qa, devops)
    #[arg(long)]
    pub fail_role: Option<String>,

    /// Run without context checkpoints
    #[arg(long)]
    pub no_checkpoints: bool,
}

impl SimulateArgs {
    fn script(&self) -> Result<AgentScript> {
        let failing_role = self
            .fail_role
            .as_deref()
            .map(|role| {
                role.parse::<AgentRole>()
                    .map(|role| (role, format!("Simulated {role} agent failure")))
            })
            .transpose()?;
        Ok(AgentScript {
            qa_failures_before_pass: self.qa_failures,
            smoke_tests_pass: !self.smoke_fail,
            rollback_succeeds: !self.rollback_fail,
            failing_role,
            fail_terminations: false,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulationOutput {
    status: ResultStatus,
    workflow_id: Uuid,
    task_type: String,
    phase: String,
    error: Option<String>,
    retry_count: u32,
    max_retries: u32,
    agent_history: Vec<AgentSpawn>,
    phase_results: BTreeMap<PhaseName, PhaseResult>,
    approval_log: Vec<ApprovalRecord>,
    invocations: InvocationCounts,
    events: Vec<String>,
}

impl CommandOutput for SimulationOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        let mut lines = vec![
            format!("Workflow {} ({})", self.workflow_id, self.task_type),
            format!("  Status:  {}", self.status),
            format!("  Phase:   {}", self.phase),
            format!("  Retries: {}/{}", self.retry_count, self.max_retries),
        ];
        if let Some(error) = &self.error {
            lines.push(format!("  Error:   {error}"));
        }
        for gate in &self.approval_log {
            lines.push(format!("  Approval gate: {}", gate.phase));
        }
        if !self.agent_history.is_empty() {
            lines.push(String::new());
            lines.push(formatter.format_agent_history(&self.agent_history));
        }
        if !self.phase_results.is_empty() {
            lines.push(formatter.format_phase_results(&self.phase_results));
        }
        lines.push(format!("Events: {}", self.events.join(", ")));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: SimulateArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;
    let task = load_task(&args.task_file)?;
    let agents = Arc::new(ScriptedAgents::new(args.script()?));
    let checkpoints: Arc<dyn ContextCheckpointStore> = if args.no_checkpoints {
        Arc::new(NullContextStore::new())
    } else {
        Arc::new(InMemoryContextStore::new())
    };

    let orchestrator = WorkflowOrchestrator::from_config(
        agents.clone(),
        AgentExecutors::from_shared(agents.clone()),
        checkpoints,
        &config,
    );

    let mut events = orchestrator.events().subscribe();
    let result = orchestrator.execute_task(&task).await?;

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event.kind.to_string());
    }

    let state = result.workflow_state;
    let out = SimulationOutput {
        status: result.status,
        workflow_id: state.id,
        task_type: state.task_type,
        phase: state.phase.to_string(),
        error: state.error,
        retry_count: state.retry_count,
        max_retries: state.max_retries,
        agent_history: state.agent_history,
        phase_results: result.phase_results,
        approval_log: state.approval_log,
        invocations: agents.counts(),
        events: seen,
    };
    output(&out, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(fail_role: Option<&str>) -> SimulateArgs {
        SimulateArgs {
            task_file: PathBuf::from("task.yaml"),
            qa_failures: 1,
            smoke_fail: true,
            rollback_fail: false,
            fail_role: fail_role.map(str::to_string),
            no_checkpoints: false,
        }
    }

    #[test]
    fn test_script_from_flags() {
        let script = args(Some("qa")).script().unwrap();
        assert_eq!(script.qa_failures_before_pass, 1);
        assert!(!script.smoke_tests_pass);
        assert!(script.rollback_succeeds);
        assert_eq!(script.failing_role.unwrap().0, AgentRole::Qa);
    }

    #[test]
    fn test_unknown_fail_role_rejected() {
        assert!(args(Some("manager")).script().is_err());
    }
}
