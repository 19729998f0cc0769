use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::workflow_state::DEFAULT_MAX_RETRIES;

/// Main configuration structure for Convoy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Orchestration defaults
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Lifecycle event bus configuration
    #[serde(default)]
    pub events: EventsConfig,

    /// Workflow retention policy
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Orchestration defaults applied when a task does not override them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrchestratorConfig {
    /// Retry budget for the implementation/QA loop
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,

    /// Deployment environment when `config.environment` is absent
    #[serde(default = "default_environment")]
    pub default_environment: String,

    /// Page size used when listing agents for monitoring
    #[serde(default = "default_monitor_list_limit")]
    pub monitor_list_limit: usize,
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_environment() -> String {
    "staging".to_string()
}

const fn default_monitor_list_limit() -> usize {
    100
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_max_retries: default_max_retries(),
            default_environment: default_environment(),
            monitor_list_limit: default_monitor_list_limit(),
        }
    }
}

/// Event bus configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EventsConfig {
    /// Capacity of the broadcast channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

const fn default_channel_capacity() -> usize {
    1024
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Retention of terminal workflows in the in-memory store.
///
/// Both limits unset means workflows are kept for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetentionConfig {
    /// Evict terminal workflows completed longer ago than this
    #[serde(default)]
    pub max_terminal_age_secs: Option<u64>,

    /// Keep at most this many terminal workflows
    #[serde(default)]
    pub max_terminal_entries: Option<usize>,

    /// Interval between background eviction sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

const fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_terminal_age_secs: None,
            max_terminal_entries: None,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl RetentionConfig {
    /// Whether any eviction limit is configured.
    pub fn is_bounded(&self) -> bool {
        self.max_terminal_age_secs.is_some() || self.max_terminal_entries.is_some()
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
