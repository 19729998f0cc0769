//! CLI command implementations.

pub mod config;
pub mod route;
pub mod simulate;

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::models::OrchestratorTask;

/// Read a task from a YAML or JSON file.
pub fn load_task(path: &Path) -> Result<OrchestratorTask> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read task file {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse task file {}", path.display()))
    } else {
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse task file {}", path.display()))
    }
}
