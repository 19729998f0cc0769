//! In-process adapters for the orchestrator's ports.
//!
//! Used by `convoy simulate` and the test-suite.

pub mod context_store;
pub mod scripted_agents;

pub use context_store::InMemoryContextStore;
pub use scripted_agents::{AgentScript, InvocationCounts, ScriptedAgents};
