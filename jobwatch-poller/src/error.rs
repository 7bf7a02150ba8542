//! Errors raised by the watch machinery
//!
//! These describe the watcher breaking, never the watched job: a job that
//! ends in `FAILURE` or `REVOKED` is returned as a regular snapshot.

use jobwatch_client::ClientError;
use jobwatch_core::domain::job::{JobHandle, JobId};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    /// The job stayed non-terminal for the whole timeout
    #[error("job {id} timed out after {elapsed:?} ({})", describe_last(.last))]
    Timeout {
        id: JobId,
        elapsed: Duration,
        /// Last snapshot observed before the deadline, if any
        last: Option<Box<JobHandle>>,
    },

    /// The backend does not know the job id
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// A permanent error while querying the backend
    #[error("failed to query job {id}: {source}")]
    Client {
        id: JobId,
        #[source]
        source: ClientError,
    },

    #[error("invalid poll configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid job id: {0:?}")]
    InvalidJobId(String),

    /// The poll session ended without reaching a terminal snapshot
    #[error("watch aborted: {0}")]
    Aborted(String),
}

impl WatchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Id of the job the error refers to
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Self::Timeout { id, .. } | Self::NotFound(id) | Self::Client { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Last snapshot seen before the watch stopped
    pub fn last_snapshot(&self) -> Option<&JobHandle> {
        match self {
            Self::Timeout { last, .. } => last.as_deref(),
            _ => None,
        }
    }
}

fn describe_last(last: &Option<Box<JobHandle>>) -> String {
    match last {
        Some(handle) => format!(
            "last status {}, {}% complete",
            handle.status,
            handle.percent()
        ),
        None => "no status observed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobwatch_core::domain::job::JobStatus;

    #[test]
    fn test_timeout_message_names_job_and_last_status() {
        let err = WatchError::Timeout {
            id: JobId::new("render-42"),
            elapsed: Duration::from_secs(30),
            last: Some(Box::new(
                JobHandle::new("render-42", JobStatus::Running).with_progress(0.25),
            )),
        };

        let message = err.to_string();
        assert!(message.contains("render-42"));
        assert!(message.contains("RUNNING"));
        assert!(message.contains("25%"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_timeout_without_snapshot() {
        let err = WatchError::Timeout {
            id: JobId::new("render-42"),
            elapsed: Duration::from_secs(30),
            last: None,
        };

        assert!(err.to_string().contains("no status observed"));
        assert!(err.last_snapshot().is_none());
        assert_eq!(err.job_id().map(JobId::as_str), Some("render-42"));
    }

    #[test]
    fn test_aborted_session_is_not_a_timeout() {
        let err = WatchError::Aborted(
            "watch of job render-42 ended without a terminal snapshot".to_string(),
        );

        assert!(!err.is_timeout());
        assert!(err.job_id().is_none());
        assert!(err.to_string().starts_with("watch aborted:"));
    }
}
