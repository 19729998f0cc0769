//! `convoy config`: inspect the effective configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the merged configuration
    Show,
    /// Validate the merged configuration, or a single file
    Validate {
        /// Validate this file on top of the defaults instead
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    #[serde(flatten)]
    config: Config,
}

impl CommandOutput for ShowOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    source: String,
    valid: bool,
}

impl CommandOutput for ValidateOutput {
    fn to_human(&self) -> String {
        format!("Configuration from {} is valid.", self.source)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ConfigArgs, json_mode: bool) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = ConfigLoader::load().context("Failed to load configuration")?;
            output(&ShowOutput { config }, json_mode);
        }
        ConfigCommands::Validate { file } => {
            let source = match file {
                Some(path) => {
                    ConfigLoader::load_from_file(&path)?;
                    path.display().to_string()
                }
                None => {
                    ConfigLoader::load().context("Failed to load configuration")?;
                    ".convoy/ and CONVOY_* environment".to_string()
                }
            };
            output(&ValidateOutput { source, valid: true }, json_mode);
        }
    }
    Ok(())
}
