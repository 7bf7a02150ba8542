//! Single-job command handlers
//!
//! Handles one-shot status queries, blocking waits and progress watches.

use anyhow::{Context, Result};
use colored::*;
use jobwatch_client::JobClient;
use jobwatch_core::domain::job::{JobHandle, JobId, JobStatus};
use jobwatch_poller::{PollLoop, WatchError};
use std::sync::Arc;

use crate::config::Config;
use crate::display::{print_job_details, print_snapshot_line, print_watch_error};

/// Get and display a single job
pub async fn get_job(config: &Config, id: &str) -> Result<bool> {
    let id = JobId::new(id);
    let handle = config
        .client()
        .fetch(&id)
        .await
        .with_context(|| format!("Failed to fetch job {}", id))?;

    print_handle(config, &handle)?;

    Ok(true)
}

/// Wait for a job and display its final snapshot
pub async fn wait_job(config: &Config, id: &str) -> Result<bool> {
    let poll_loop = poll_loop(config)?;
    let id = JobId::new(id);

    if !config.json {
        println!(
            "{} {} (timeout {:?})",
            "Waiting for job".dimmed(),
            id.to_string().cyan(),
            poll_loop.config().timeout
        );
    }

    match poll_loop.run(&id).await {
        Ok(handle) => {
            print_handle(config, &handle)?;
            Ok(handle.status == JobStatus::Success)
        }
        Err(e) => report_watch_error(e),
    }
}

/// Print every snapshot of a job until it finishes
///
/// Ctrl-C stops watching; the job itself keeps running.
pub async fn watch_job(config: &Config, id: &str) -> Result<bool> {
    let mut watch = poll_loop(config)?.watch(&JobId::new(id))?;

    loop {
        let item = tokio::select! {
            item = watch.next() => item,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("{}", "Stopped watching (the job was not cancelled)".yellow());
                return Ok(false);
            }
        };

        match item {
            Some(Ok(handle)) => {
                if config.json {
                    println!("{}", serde_json::to_string(&handle)?);
                } else {
                    print_snapshot_line(&handle);
                }
                if handle.is_terminal() {
                    if !config.json {
                        if let Some(error) = &handle.error_message {
                            println!("{}", error.red());
                        }
                    }
                    return Ok(handle.status == JobStatus::Success);
                }
            }
            Some(Err(e)) => return report_watch_error(e),
            None => return Ok(false),
        }
    }
}

fn poll_loop(config: &Config) -> Result<PollLoop> {
    let settings = config.settings()?;
    let client: Arc<dyn JobClient> = Arc::new(settings.build_client()?);
    Ok(PollLoop::new(client, settings.poll)?)
}

fn print_handle(config: &Config, handle: &JobHandle) -> Result<()> {
    if config.json {
        println!("{}", serde_json::to_string_pretty(handle)?);
    } else {
        print_job_details(handle);
    }
    Ok(())
}

/// Timeouts are an expected outcome of waiting; anything else is an error
fn report_watch_error(err: WatchError) -> Result<bool> {
    if err.is_timeout() {
        print_watch_error(&err);
        return Ok(false);
    }
    Err(err).context("Watch failed")
}
