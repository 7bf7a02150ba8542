//! Watch configuration
//!
//! Defines the polling parameters of a single watch, the fan-out limits of
//! the orchestrator and the settings loaded from the environment.

use anyhow::Context;
use jobwatch_client::HttpJobClient;
use std::time::Duration;

use crate::error::WatchError;

/// Default delay between two status queries
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Delay growth between consecutive polls
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Poll every `interval`
    Constant,
    /// Multiply the delay by `factor` after every non-terminal poll, up to `max`
    Exponential { factor: f64, max: Duration },
}

/// Polling parameters of a watch
///
/// No `Default`: every watch needs an explicit timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Delay between two status queries
    pub interval: Duration,

    /// Wall-clock budget measured from the first query
    pub timeout: Duration,

    /// How the delay evolves while the job stays non-terminal
    pub backoff: Backoff,
}

impl PollConfig {
    /// Creates a configuration with the default interval and constant delay
    pub fn new(timeout: Duration) -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout,
            backoff: Backoff::Constant,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.timeout.is_zero() {
            return Err(WatchError::InvalidConfig(
                "timeout must be greater than 0".to_string(),
            ));
        }

        if self.interval.is_zero() {
            return Err(WatchError::InvalidConfig(
                "interval must be greater than 0".to_string(),
            ));
        }

        if self.interval > self.timeout {
            return Err(WatchError::InvalidConfig(format!(
                "interval ({:?}) must not exceed timeout ({:?})",
                self.interval, self.timeout
            )));
        }

        if let Backoff::Exponential { factor, max } = self.backoff {
            if !factor.is_finite() || factor < 1.0 {
                return Err(WatchError::InvalidConfig(format!(
                    "backoff factor must be a finite number >= 1, got {}",
                    factor
                )));
            }
            if max < self.interval {
                return Err(WatchError::InvalidConfig(
                    "backoff max must not be below the interval".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Delay to wait after the `polls`-th non-terminal snapshot (1-based)
    pub fn delay_after(&self, polls: u32) -> Duration {
        match self.backoff {
            Backoff::Constant => self.interval,
            Backoff::Exponential { factor, max } => {
                let exponent = polls.saturating_sub(1).min(i32::MAX as u32) as i32;
                let secs = self.interval.as_secs_f64() * factor.powi(exponent);
                Duration::from_secs_f64(secs.min(max.as_secs_f64()))
            }
        }
    }
}

/// Fan-out limits of the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Polling parameters; `poll.timeout` bounds the whole batch
    pub poll: PollConfig,

    /// Maximum number of jobs submitted and watched at the same time
    pub max_concurrent: usize,
}

impl OrchestratorConfig {
    pub fn new(poll: PollConfig) -> Self {
        Self {
            poll,
            max_concurrent: 8,
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn validate(&self) -> Result<(), WatchError> {
        self.poll.validate()?;
        if self.max_concurrent == 0 {
            return Err(WatchError::InvalidConfig(
                "max_concurrent must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection and polling settings
///
/// All timeouts and intervals are configurable to allow tuning
/// for different backends (fast local queues vs slow batch clusters).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Job backend base URL (e.g., "http://localhost:8080")
    pub base_url: String,

    /// Bearer token for the backend
    pub token: Option<String>,

    /// Polling parameters
    pub poll: PollConfig,

    /// Maximum number of jobs watched at the same time
    pub max_concurrent: usize,

    /// Per-request HTTP timeout; an expired request counts as a transient error
    pub request_timeout: Duration,
}

impl Settings {
    /// Creates settings with defaults for everything but the URL and timeout
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            base_url,
            token: None,
            poll: PollConfig::new(timeout),
            max_concurrent: 8,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Creates settings from environment variables
    ///
    /// Expected environment variables:
    /// - JOBWATCH_URL (required)
    /// - POLL_TIMEOUT_SECONDS (required, fractional allowed)
    /// - POLL_INTERVAL_SECONDS (optional, fractional allowed, default: 2)
    /// - JOBWATCH_TOKEN (optional)
    /// - JOBWATCH_MAX_CONCURRENT (optional, default: 8)
    /// - JOBWATCH_REQUEST_TIMEOUT_SECONDS (optional, default: 30)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates settings from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("JOBWATCH_URL")
            .ok_or_else(|| anyhow::anyhow!("JOBWATCH_URL environment variable not set"))?;

        let timeout = lookup("POLL_TIMEOUT_SECONDS")
            .ok_or_else(|| anyhow::anyhow!("POLL_TIMEOUT_SECONDS environment variable not set"))
            .and_then(|s| parse_seconds("POLL_TIMEOUT_SECONDS", &s))?;

        let mut settings = Self::new(base_url, timeout);

        if let Some(s) = lookup("POLL_INTERVAL_SECONDS") {
            settings.poll.interval = parse_seconds("POLL_INTERVAL_SECONDS", &s)?;
        }

        if let Some(s) = lookup("JOBWATCH_REQUEST_TIMEOUT_SECONDS") {
            settings.request_timeout = parse_seconds("JOBWATCH_REQUEST_TIMEOUT_SECONDS", &s)?;
        }

        if let Some(s) = lookup("JOBWATCH_MAX_CONCURRENT") {
            settings.max_concurrent = s
                .trim()
                .parse::<usize>()
                .with_context(|| format!("JOBWATCH_MAX_CONCURRENT is not a number: {:?}", s))?;
        }

        settings.token = lookup("JOBWATCH_TOKEN").filter(|t| !t.is_empty());

        Ok(settings)
    }

    /// Validates the settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("base_url cannot be empty");
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("base_url must start with http:// or https://");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        self.orchestrator_config().validate()?;

        Ok(())
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::new(self.poll.clone()).with_max_concurrent(self.max_concurrent)
    }

    /// Builds the HTTP client shared by every watch started from these settings
    pub fn build_client(&self) -> anyhow::Result<HttpJobClient> {
        let http = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let client = HttpJobClient::with_client(self.base_url.clone(), http);
        Ok(match &self.token {
            Some(token) => client.with_token(token.clone()),
            None => client,
        })
    }
}

fn parse_seconds(name: &str, value: &str) -> anyhow::Result<Duration> {
    let secs = value
        .trim()
        .parse::<f64>()
        .with_context(|| format!("{} is not a number: {:?}", name, value))?;

    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("{} must be a non-negative number of seconds", name))
}
