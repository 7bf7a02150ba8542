//! Batch command handlers
//!
//! Submits or collects several jobs and waits for all of them through the
//! orchestrator.

use anyhow::{Context, Result};
use colored::*;
use jobwatch_client::{JobClient, JobSubmitter};
use jobwatch_core::domain::job::JobId;
use jobwatch_core::dto::job::SubmitJob;
use jobwatch_poller::{JobOutcome, Orchestrator, OutcomeSummary, Submission};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::display::print_outcomes;

/// One entry of a `run-many` batch file
#[derive(Debug, Deserialize)]
struct BatchEntry {
    /// Defaults to the entry's position in the file
    key: Option<String>,
    kind: String,
    #[serde(default)]
    parameters: HashMap<String, serde_json::Value>,
}

/// Wait for existing jobs
pub async fn wait_all(config: &Config, ids: Vec<String>) -> Result<bool> {
    let orchestrator = orchestrator(config)?;
    let jobs = ids.into_iter().map(|id| (id.clone(), JobId::new(id)));

    let outcomes = orchestrator.watch_all(jobs).await;
    report(config, &outcomes)
}

/// Submit every job of a batch file and wait for all of them
pub async fn run_many(config: &Config, file: &Path) -> Result<bool> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read batch file {}", file.display()))?;
    let submissions = parse_batch(&contents)
        .with_context(|| format!("Invalid batch file {}", file.display()))?;

    debug!("Loaded {} job(s) from {}", submissions.len(), file.display());

    if submissions.is_empty() {
        if config.json {
            return report(config, &BTreeMap::new());
        }
        println!("{}", "Batch file contains no jobs.".yellow());
        return Ok(true);
    }

    let orchestrator = orchestrator(config)?;
    if !config.json {
        println!(
            "{}",
            format!("Submitting {} job(s)...", submissions.len()).bold()
        );
    }

    let outcomes = orchestrator.run_many(submissions).await;
    report(config, &outcomes)
}

fn orchestrator(config: &Config) -> Result<Orchestrator> {
    let settings = config.settings()?;
    let client = Arc::new(settings.build_client()?);

    let submitter: Arc<dyn JobSubmitter> = client.clone();
    let client: Arc<dyn JobClient> = client;

    Ok(Orchestrator::new(
        submitter,
        client,
        settings.orchestrator_config(),
    )?)
}

fn parse_batch(contents: &str) -> Result<Vec<Submission>> {
    let entries: Vec<BatchEntry> = serde_json::from_str(contents)?;

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let key = entry.key.unwrap_or_else(|| index.to_string());
            Submission::new(
                key,
                SubmitJob {
                    kind: entry.kind,
                    parameters: entry.parameters,
                },
            )
        })
        .collect())
}

fn report(config: &Config, outcomes: &BTreeMap<String, JobOutcome>) -> Result<bool> {
    if config.json {
        println!("{}", serde_json::to_string_pretty(outcomes)?);
    } else {
        print_outcomes(outcomes);
    }

    Ok(OutcomeSummary::from_outcomes(outcomes.values()).all_succeeded())
}
