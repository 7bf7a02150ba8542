//! Configuration module
//!
//! Turns the global CLI flags into watch settings.

use anyhow::{Context, Result};
use jobwatch_client::HttpJobClient;
use jobwatch_poller::Settings;
use std::time::Duration;
use tracing::debug;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the job backend
    pub url: String,
    /// Bearer token for the job backend
    pub token: Option<String>,
    /// Seconds between two status queries
    pub interval: f64,
    /// Seconds to wait before giving up
    pub timeout: Option<f64>,
    /// Maximum number of jobs watched at the same time
    pub max_concurrent: usize,
    /// Print results as JSON
    pub json: bool,
}

impl Config {
    /// Builds validated watch settings
    ///
    /// Fails when no timeout was given: waiting commands never wait forever.
    pub fn settings(&self) -> Result<Settings> {
        let timeout = self
            .timeout
            .context("a timeout is required: pass --timeout or set POLL_TIMEOUT_SECONDS")?;

        let mut settings = Settings::new(self.url.clone(), seconds("--timeout", timeout)?);
        settings.poll.interval = seconds("--interval", self.interval)?;
        settings.token = self.token.clone().filter(|t| !t.is_empty());
        settings.max_concurrent = self.max_concurrent;
        settings.validate()?;

        debug!(
            "Backend {} (interval {:?}, timeout {:?}, max {} concurrent)",
            settings.base_url, settings.poll.interval, settings.poll.timeout, settings.max_concurrent
        );

        Ok(settings)
    }

    /// Builds a client for one-shot queries, which need no timeout
    pub fn client(&self) -> HttpJobClient {
        let client = HttpJobClient::new(self.url.clone());
        match self.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => client.with_token(token),
            None => client,
        }
    }
}

fn seconds(flag: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("{} must be a non-negative number of seconds", flag))
}
