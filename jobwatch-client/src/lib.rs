//! jobwatch HTTP client
//!
//! Status queries and job submission against a remote job backend.
//!
//! The watch machinery in `jobwatch-poller` only depends on the
//! [`JobClient`] and [`JobSubmitter`] traits; [`HttpJobClient`] is the
//! implementation for backends exposing `GET /jobs/{id}` and `POST /jobs`.
//!
//! # Example
//!
//! ```no_run
//! use jobwatch_client::{HttpJobClient, JobClient};
//! use jobwatch_core::JobId;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HttpJobClient::new("http://localhost:8080");
//!
//!     let handle = client.fetch(&JobId::new("4f1c2a")).await?;
//!     println!("{} is {} ({}%)", handle.id, handle.status, handle.percent());
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;

// Re-export commonly used types
pub use error::{ClientError, Result};

use async_trait::async_trait;
use jobwatch_core::domain::job::{JobHandle, JobId};
use jobwatch_core::dto::job::SubmitJob;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

/// Source of job status snapshots
///
/// Implementations perform one read-only query per call and keep no cache.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Fetches the current snapshot of a job
    ///
    /// # Errors
    /// * [`ClientError::Transient`] on connection-level failures
    /// * [`ClientError::NotFound`] when the backend does not know `id`
    async fn fetch(&self, id: &JobId) -> Result<JobHandle>;
}

/// Accepts new units of work and hands back their ids
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Submits a job and returns the id the backend assigned to it
    async fn submit(&self, request: &SubmitJob) -> Result<JobId>;
}

/// HTTP client for a remote job backend
///
/// Cloning is cheap: clones share the underlying connection pool, which is
/// how concurrent watchers share one transport.
#[derive(Debug, Clone)]
pub struct HttpJobClient {
    /// Base URL of the backend (e.g., "http://localhost:8080")
    base_url: String,
    /// Bearer token sent with every request
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl HttpJobClient {
    /// Create a new job client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the job backend (e.g., "http://localhost:8080")
    ///
    /// # Example
    /// ```
    /// use jobwatch_client::HttpJobClient;
    ///
    /// let client = HttpJobClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new job client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use jobwatch_client::HttpJobClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = HttpJobClient::with_client("http://localhost:8080", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL of the backend
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build `{base_url}/{segments...}` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ClientError::InvalidRequest(format!("invalid base URL {:?}: {}", self.base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidRequest(format!("base URL {:?} cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::from_status(status.as_u16(), error_text));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
