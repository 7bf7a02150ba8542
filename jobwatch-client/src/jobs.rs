//! Job-related API endpoints

use async_trait::async_trait;
use jobwatch_core::domain::job::{JobHandle, JobId};
use jobwatch_core::dto::job::{JobStatusResponse, SubmitJob, SubmitJobResponse};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::{HttpJobClient, JobClient, JobSubmitter};

#[async_trait]
impl JobClient for HttpJobClient {
    /// Get the current status of a job (`GET /jobs/{id}`)
    async fn fetch(&self, id: &JobId) -> Result<JobHandle> {
        if id.is_empty() {
            return Err(ClientError::InvalidRequest("job id cannot be empty".to_string()));
        }

        let url = self.endpoint(&["jobs", id.as_str()])?;
        debug!("GET {}", url);
        let response = self.authorize(self.client.get(url)).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(id.to_string()));
        }

        let body: JobStatusResponse = self.handle_response(response).await?;
        body.into_handle(id.clone())
            .map_err(|e| ClientError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl JobSubmitter for HttpJobClient {
    /// Submit a new job (`POST /jobs`)
    ///
    /// # Example
    /// ```no_run
    /// # use jobwatch_client::{HttpJobClient, JobSubmitter};
    /// # use jobwatch_core::dto::job::SubmitJob;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = HttpJobClient::new("http://localhost:8080");
    /// let id = client
    ///     .submit(&SubmitJob::new("thumbnail").with_parameter("size", 128.into()))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn submit(&self, request: &SubmitJob) -> Result<JobId> {
        if request.kind.trim().is_empty() {
            return Err(ClientError::InvalidRequest("job kind cannot be empty".to_string()));
        }

        let url = self.endpoint(&["jobs"])?;
        debug!("POST {} (kind {})", url, request.kind);
        let response = self
            .authorize(self.client.post(url))
            .json(request)
            .send()
            .await?;

        let body: SubmitJobResponse = self.handle_response(response).await?;
        let id = JobId::new(body.id);
        if id.is_empty() {
            return Err(ClientError::ParseError(
                "backend accepted the job but returned an empty id".to_string(),
            ));
        }

        Ok(id)
    }
}
