//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod batch;
mod job;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the current status of a job
    Get {
        /// Job ID
        id: String,
    },
    /// Wait for a job to finish
    Wait {
        /// Job ID
        id: String,
    },
    /// Follow a job's progress until it finishes
    Watch {
        /// Job ID
        id: String,
    },
    /// Wait for several existing jobs to finish
    WaitAll {
        /// Job IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Submit a batch of jobs from a JSON file and wait for all of them
    RunMany {
        /// JSON array of `{"key", "kind", "parameters"}` objects
        file: PathBuf,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Returns
/// Success when every job involved finished with `SUCCESS`
pub async fn handle_command(command: Commands, config: &Config) -> Result<ExitCode> {
    let succeeded = match command {
        Commands::Get { id } => job::get_job(config, &id).await?,
        Commands::Wait { id } => job::wait_job(config, &id).await?,
        Commands::Watch { id } => job::watch_job(config, &id).await?,
        Commands::WaitAll { ids } => batch::wait_all(config, ids).await?,
        Commands::RunMany { file } => batch::run_many(config, &file).await?,
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
