//! jobwatch poller
//!
//! Watches remote jobs until they reach a terminal status.
//!
//! Architecture:
//! - Configuration: polling parameters and environment settings
//! - Scheduler: the poll loop state machine, watch streams and the
//!   orchestrator for batches
//!
//! Job outcomes (success, failure, revocation) are always returned as data.
//! Errors only describe the watch itself breaking: a timeout, an unknown
//! id or a backend that cannot be queried.
//!
//! # Example
//!
//! ```no_run
//! use jobwatch_core::JobId;
//! use jobwatch_poller::{PollConfig, PollLoop};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Arc::new(jobwatch_client::HttpJobClient::new("http://localhost:8080"));
//!     let config = PollConfig::new(Duration::from_secs(300)).with_interval(Duration::from_secs(1));
//!
//!     let handle = PollLoop::new(client, config)?.run(&JobId::new("4f1c2a")).await?;
//!     println!("{} finished as {}", handle.id, handle.status);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use config::{Backoff, OrchestratorConfig, PollConfig, Settings};
pub use error::WatchError;
pub use scheduler::{
    JobOutcome, JobStream, Orchestrator, OutcomeSummary, PollLoop, PollState, Submission,
    WatchStream,
};
