//! Table output formatting for CLI commands
//!
//! Renders workflow agent history and phase results using comfy-table.

use std::collections::BTreeMap;
use std::env;

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use super::truncate;
use crate::domain::models::{AgentRole, AgentSpawn, PhaseName, PhaseResult};

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format the agent spawn history of a workflow
    pub fn format_agent_history(&self, history: &[AgentSpawn]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Phase").add_attribute(Attribute::Bold),
            Cell::new("Role").add_attribute(Attribute::Bold),
            Cell::new("Agent").add_attribute(Attribute::Bold),
            Cell::new("Spawned").add_attribute(Attribute::Bold),
        ]);

        for (i, spawn) in history.iter().enumerate() {
            let role_cell = if self.use_colors {
                Cell::new(spawn.agent_type.as_str()).fg(role_color(spawn.agent_type))
            } else {
                Cell::new(spawn.agent_type.as_str())
            };
            let agent_id = spawn.agent_id.to_string();
            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(spawn.phase.as_str()),
                role_cell,
                Cell::new(&agent_id[..8]),
                Cell::new(spawn.spawned_at.format("%H:%M:%S%.3f").to_string()),
            ]);
        }

        table.to_string()
    }

    /// Format the recorded result of each phase
    pub fn format_phase_results(&self, results: &BTreeMap<PhaseName, PhaseResult>) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Phase").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Details").add_attribute(Attribute::Bold),
        ]);

        for (phase, result) in results {
            let value = result.to_value();
            let status = value
                .get("status")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("-")
                .to_string();
            let status_cell = if self.use_colors {
                Cell::new(&status).fg(status_color(&status))
            } else {
                Cell::new(&status)
            };
            table.add_row(vec![
                Cell::new(phase.as_str()),
                status_cell,
                Cell::new(truncate(&phase_details(result), 60)),
            ]);
        }

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if terminal supports colors
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

fn role_color(role: AgentRole) -> Color {
    match role {
        AgentRole::Planner => Color::Blue,
        AgentRole::Dev => Color::Cyan,
        AgentRole::Qa => Color::Yellow,
        AgentRole::DevOps => Color::Magenta,
    }
}

fn status_color(status: &str) -> Color {
    match status {
        "passed" | "deployed" | "implemented" | "fixed" | "plan_created" | "rollback_completed" => {
            Color::Green
        }
        "failed" | "rollback_failed" => Color::Red,
        _ => Color::Yellow,
    }
}

/// One-line summary of the fields the orchestrator acts on.
fn phase_details(result: &PhaseResult) -> String {
    match result {
        PhaseResult::Plan(plan) => format!("{} stories", plan.stories.len()),
        PhaseResult::Implementation(dev) => dev.files_for_review().join(", "),
        PhaseResult::Qa(qa) => format!(
            "{}/{} passed, {} failed",
            qa.test_results.passed, qa.test_results.total, qa.test_results.failed
        ),
        PhaseResult::DevOps(ops) => {
            if ops.smoke_tests_passed() {
                format!("{} healthy", ops.deployment_id())
            } else {
                ops.deployment_id().to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DevOpsResult, QaResult, QaStatus, TestResults};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_agent_history_table() {
        let history = vec![AgentSpawn {
            agent_type: AgentRole::Qa,
            agent_id: Uuid::new_v4(),
            phase: PhaseName::Qa,
            spawned_at: Utc::now(),
        }];
        let rendered = TableFormatter::with_config(false, Some(100)).format_agent_history(&history);
        assert!(rendered.contains("Phase"));
        assert!(rendered.contains("qa"));
    }

    #[test]
    fn test_phase_results_table() {
        let mut results = BTreeMap::new();
        results.insert(
            PhaseName::Qa,
            PhaseResult::Qa(QaResult {
                status: QaStatus::Failed,
                test_results: TestResults { total: 10, passed: 8, failed: 2 },
                extra: serde_json::Map::new(),
            }),
        );
        results.insert(
            PhaseName::Rollback,
            PhaseResult::DevOps(DevOpsResult::RollbackCompleted {
                deployment_id: "dep-1".to_string(),
            }),
        );
        let rendered = TableFormatter::with_config(false, Some(120)).format_phase_results(&results);
        assert!(rendered.contains("8/10 passed, 2 failed"));
        assert!(rendered.contains("rollback_completed"));
    }
}
