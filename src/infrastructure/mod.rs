//! Infrastructure layer module
//!
//! This module contains the adapters and process-level plumbing:
//! - Configuration management
//! - Logging infrastructure
//! - In-process implementations of the agent and checkpoint ports
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod logging;
pub mod memory;
