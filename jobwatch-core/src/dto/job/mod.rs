//! Job DTOs for the remote status and submission endpoints

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::domain::job::{JobHandle, JobId, JobStatus, UnknownStatus, normalize_progress};

/// Body of `GET /jobs/{id}`
///
/// `progress` may be a fraction (`0.0..=1.0`) or a percentage (`0..=100`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub status: String,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub extras: Option<BTreeMap<String, serde_json::Value>>,
}

impl JobStatusResponse {
    /// Converts the response into a snapshot for `id`
    pub fn into_handle(self, id: JobId) -> Result<JobHandle, UnknownStatus> {
        let status: JobStatus = self.status.parse()?;

        let progress = match (status, self.progress) {
            (JobStatus::Success, _) => 1.0,
            (_, Some(raw)) => normalize_progress(raw),
            (_, None) => 0.0,
        };

        let error_message = if status == JobStatus::Failure {
            self.error_message
        } else {
            None
        };

        Ok(JobHandle {
            id,
            status,
            progress,
            error_message,
            extras: self.extras.unwrap_or_default(),
            observed_at: Utc::now(),
        })
    }
}

/// Request to submit a new unit of work (`POST /jobs`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitJob {
    pub kind: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

impl SubmitJob {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// Response of `POST /jobs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub id: String,
}
