//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};

use super::commands::config::ConfigArgs;
use super::commands::route::RouteArgs;
use super::commands::simulate::SimulateArgs;

#[derive(Parser)]
#[command(name = "convoy")]
#[command(about = "Convoy - multi-agent delivery workflow orchestrator", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the phases a task file would run
    Route(RouteArgs),

    /// Run a task file end-to-end against scripted in-process agents
    Simulate(SimulateArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}
