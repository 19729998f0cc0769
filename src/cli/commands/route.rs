//! `convoy route`: show the phase plan of a task.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::load_task;
use crate::cli::output::{output, CommandOutput};
use crate::services::workflow_router::{RoutePlan, WorkflowRouter};

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Task file (YAML or JSON)
    pub task_file: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteOutput {
    task_id: String,
    #[serde(flatten)]
    plan: RoutePlan,
}

impl CommandOutput for RouteOutput {
    fn to_human(&self) -> String {
        let phases = if self.plan.phases.is_empty() {
            "(no phases, completes immediately)".to_string()
        } else {
            self.plan
                .phases
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(" → ")
        };
        let mut lines = vec![
            format!("Task {} ({})", self.task_id, self.plan.task_type),
            format!("  Phases: {phases}"),
        ];
        if let Some(kind) = self.plan.verification {
            lines.push(format!("  QA retry loop: {kind:?}"));
        }
        if self.plan.guarded_deployment {
            lines.push("  Rollback on smoke test failure: yes".to_string());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RouteArgs, json_mode: bool) -> Result<()> {
    let task = load_task(&args.task_file)?;
    let plan = WorkflowRouter::plan(&task)?;
    output(
        &RouteOutput {
            task_id: task.id,
            plan,
        },
        json_mode,
    );
    Ok(())
}
