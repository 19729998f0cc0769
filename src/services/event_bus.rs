//! EventBus service for workflow lifecycle notifications.
//!
//! Provides a broadcast-based event system with sequence numbering. Every
//! published event is also mirrored into the `tracing` log. Publishing never
//! blocks and never fails, whether or not anyone is subscribed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::models::{EventsConfig, PhaseName};

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing sequence number assigned by EventBus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    pub fn zero() -> Self {
        Self(0)
    }
}

impl std::fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The fixed vocabulary of workflow lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowEventKind {
    #[serde(rename = "workflow.started")]
    WorkflowStarted,
    #[serde(rename = "workflow.phase.started")]
    PhaseStarted,
    #[serde(rename = "workflow.phase.completed")]
    PhaseCompleted,
    #[serde(rename = "workflow.phase.failed")]
    PhaseFailed,
    #[serde(rename = "workflow.agent.spawned")]
    AgentSpawned,
    #[serde(rename = "workflow.agent.completed")]
    AgentCompleted,
    #[serde(rename = "workflow.completed")]
    WorkflowCompleted,
    #[serde(rename = "workflow.failed")]
    WorkflowFailed,
}

impl WorkflowEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkflowStarted => "workflow.started",
            Self::PhaseStarted => "workflow.phase.started",
            Self::PhaseCompleted => "workflow.phase.completed",
            Self::PhaseFailed => "workflow.phase.failed",
            Self::AgentSpawned => "workflow.agent.spawned",
            Self::AgentCompleted => "workflow.agent.completed",
            Self::WorkflowCompleted => "workflow.completed",
            Self::WorkflowFailed => "workflow.failed",
        }
    }

    /// Default severity for events of this kind.
    pub fn severity(&self) -> EventSeverity {
        match self {
            Self::PhaseFailed | Self::WorkflowFailed => EventSeverity::Error,
            Self::AgentSpawned | Self::AgentCompleted => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }
}

impl std::fmt::Display for WorkflowEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event envelope broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEvent {
    pub id: EventId,
    pub sequence: SequenceNumber,
    pub timestamp: DateTime<Utc>,
    pub severity: EventSeverity,
    #[serde(rename = "type")]
    pub kind: WorkflowEventKind,
    pub workflow_id: Uuid,
    pub phase: Option<PhaseName>,
    pub data: serde_json::Value,
}

/// Configuration for the EventBus.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Channel capacity for the broadcast channel.
    pub channel_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

impl From<&EventsConfig> for EventBusConfig {
    fn from(config: &EventsConfig) -> Self {
        Self {
            channel_capacity: config.channel_capacity.max(1),
        }
    }
}

/// Central event bus for broadcasting lifecycle events to multiple consumers.
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
    sequence: AtomicU64,
}

impl EventBus {
    /// Create a new EventBus with the given configuration.
    pub fn new(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Publish an event. Never blocks; a missing or lagging subscriber is not an error.
    pub fn publish(&self, mut event: WorkflowEvent) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        event.sequence = SequenceNumber(seq);

        log_event(&event);

        let _ = self.sender.send(event);
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn current_sequence(&self) -> SequenceNumber {
        SequenceNumber(self.sequence.load(Ordering::SeqCst))
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

fn log_event(event: &WorkflowEvent) {
    let phase = event.phase.map(|p| p.as_str()).unwrap_or("-");
    match event.severity {
        EventSeverity::Debug => tracing::debug!(
            workflow_id = %event.workflow_id,
            phase,
            sequence = event.sequence.0,
            data = %event.data,
            "{}",
            event.kind
        ),
        EventSeverity::Info => tracing::info!(
            workflow_id = %event.workflow_id,
            phase,
            sequence = event.sequence.0,
            data = %event.data,
            "{}",
            event.kind
        ),
        EventSeverity::Warning => tracing::warn!(
            workflow_id = %event.workflow_id,
            phase,
            sequence = event.sequence.0,
            data = %event.data,
            "{}",
            event.kind
        ),
        EventSeverity::Error => tracing::error!(
            workflow_id = %event.workflow_id,
            phase,
            sequence = event.sequence.0,
            data = %event.data,
            "{}",
            event.kind
        ),
    }
}
