//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Identifier of a remote unit of work
///
/// Opaque to jobwatch: backends hand out UUIDs, numeric ids or arbitrary
/// task names, so the id is kept as the string the backend returned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

/// Remote job status
///
/// `Success`, `Failure` and `Revoked` are terminal: once a backend reports
/// one of them for an id, it never reports anything else for that id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failure,
    Revoked,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failure | JobStatus::Revoked
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
            JobStatus::Revoked => "REVOKED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string no known backend vocabulary maps to
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    /// Parses the status vocabularies used by common job backends
    /// (Celery-style `STARTED`/`REVOKED`, CI-style `succeeded`/`cancelled`, ...)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" | "received" | "scheduled" => Ok(JobStatus::Pending),
            "started" | "running" | "progress" | "in_progress" => Ok(JobStatus::Running),
            "success" | "succeeded" | "completed" | "done" => Ok(JobStatus::Success),
            "failure" | "failed" | "error" => Ok(JobStatus::Failure),
            "revoked" | "canceled" | "cancelled" | "aborted" => Ok(JobStatus::Revoked),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Snapshot of a remote job at one point in time
///
/// Handles are never updated in place: every status query produces a new
/// snapshot which replaces the previous one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: JobId,
    pub status: JobStatus,
    /// Completion fraction in `[0.0, 1.0]`
    pub progress: f64,
    /// Only populated when `status` is `Failure`
    pub error_message: Option<String>,
    /// Result payloads keyed by task identifier, populated on completion
    #[serde(default)]
    pub extras: BTreeMap<String, serde_json::Value>,
    pub observed_at: DateTime<Utc>,
}

impl JobHandle {
    /// Creates a snapshot with no progress, error or extras
    pub fn new(id: impl Into<JobId>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            progress: if status == JobStatus::Success { 1.0 } else { 0.0 },
            error_message: None,
            extras: BTreeMap::new(),
            observed_at: Utc::now(),
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = normalize_progress(progress);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        if self.status == JobStatus::Failure {
            self.error_message = Some(message.into());
        }
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Progress as a whole percentage
    pub fn percent(&self) -> u8 {
        (self.progress.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// Normalizes a backend progress value to a fraction in `[0.0, 1.0]`
///
/// Values above 1 are read as percentages. NaN and infinities become 0.
pub fn normalize_progress(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    let fraction = if raw > 1.0 { raw / 100.0 } else { raw };
    fraction.clamp(0.0, 1.0)
}
