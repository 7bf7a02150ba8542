//! jobwatch CLI
//!
//! Command-line interface for submitting and watching remote jobs.

mod commands;
mod config;
mod display;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "jobwatch")]
#[command(about = "Submit remote jobs and watch them until they finish", long_about = None)]
struct Cli {
    /// Job backend URL
    #[arg(long, global = true, env = "JOBWATCH_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Bearer token for the job backend
    #[arg(long, global = true, env = "JOBWATCH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Seconds between two status queries
    #[arg(long, global = true, env = "POLL_INTERVAL_SECONDS", default_value_t = 2.0)]
    interval: f64,

    /// Seconds to wait before giving up (required by waiting commands)
    #[arg(long, global = true, env = "POLL_TIMEOUT_SECONDS")]
    timeout: Option<f64>,

    /// Maximum number of jobs watched at the same time
    #[arg(long, global = true, env = "JOBWATCH_MAX_CONCURRENT", default_value_t = 8)]
    max_concurrent: usize,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr so stdout only carries results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobwatch=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        url: cli.url,
        token: cli.token,
        interval: cli.interval,
        timeout: cli.timeout,
        max_concurrent: cli.max_concurrent,
        json: cli.json,
    };

    handle_command(cli.command, &config).await
}
