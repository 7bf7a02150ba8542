//! Scripted backends for tests

use async_trait::async_trait;
use jobwatch_client::{ClientError, JobClient, JobSubmitter};
use jobwatch_core::domain::job::{JobHandle, JobId, JobStatus};
use jobwatch_core::dto::job::SubmitJob;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted answer to a fetch
#[derive(Debug, Clone)]
pub enum Step {
    Status(JobStatus),
    Progress(JobStatus, f64),
    Failed(&'static str),
    Transient,
    NotFound,
    Unauthorized,
    /// Sleeps, then answers `PENDING`
    Hang(Duration),
    /// Panics inside `fetch`
    Panic,
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    current: Option<Step>,
    fetches: usize,
}

/// Job client answering from per-id scripts
///
/// Once a script runs out, its last step is repeated forever, so a job that
/// reported a terminal status keeps reporting it. Ids without a script are
/// unknown to the backend.
#[derive(Default)]
pub struct ScriptedClient {
    scripts: Mutex<HashMap<JobId, Script>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, id: &str, steps: impl IntoIterator<Item = Step>) -> Self {
        self.scripts.lock().unwrap().insert(
            JobId::new(id),
            Script {
                steps: steps.into_iter().collect(),
                ..Script::default()
            },
        );
        self
    }

    pub fn fetch_count(&self, id: &str) -> usize {
        self.scripts
            .lock()
            .unwrap()
            .get(&JobId::new(id))
            .map(|s| s.fetches)
            .unwrap_or(0)
    }

    fn next_step(&self, id: &JobId) -> Step {
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts.entry(id.clone()).or_default();
        script.fetches += 1;

        if let Some(step) = script.steps.pop_front() {
            script.current = Some(step);
        }
        script.current.clone().unwrap_or(Step::NotFound)
    }
}

#[async_trait]
impl JobClient for ScriptedClient {
    async fn fetch(&self, id: &JobId) -> Result<JobHandle, ClientError> {
        match self.next_step(id) {
            Step::Status(status) => Ok(JobHandle::new(id.clone(), status)),
            Step::Progress(status, progress) => {
                Ok(JobHandle::new(id.clone(), status).with_progress(progress))
            }
            Step::Failed(message) => {
                Ok(JobHandle::new(id.clone(), JobStatus::Failure).with_error(message))
            }
            Step::Transient => Err(ClientError::Transient("connection reset".to_string())),
            Step::NotFound => Err(ClientError::NotFound(id.to_string())),
            Step::Unauthorized => Err(ClientError::from_status(401, "token expired")),
            Step::Hang(delay) => {
                tokio::time::sleep(delay).await;
                Ok(JobHandle::new(id.clone(), JobStatus::Pending))
            }
            Step::Panic => panic!("backend client crashed while fetching {}", id),
        }
    }
}

/// Submitter using the request kind as the job id
///
/// Kinds starting with `reject` are refused by the backend.
#[derive(Default)]
pub struct EchoSubmitter {
    submitted: Mutex<Vec<String>>,
}

impl EchoSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobSubmitter for EchoSubmitter {
    async fn submit(&self, request: &SubmitJob) -> Result<JobId, ClientError> {
        if request.kind.starts_with("reject") {
            return Err(ClientError::from_status(400, "unsupported job kind"));
        }
        self.submitted.lock().unwrap().push(request.kind.clone());
        Ok(JobId::new(request.kind.clone()))
    }
}

mod tests {
    use super::*;

    #[tokio::test]
    async fn test_terminal_status_is_stable() {
        let client = ScriptedClient::new().script(
            "job-a",
            [
                Step::Status(JobStatus::Pending),
                Step::Status(JobStatus::Success),
            ],
        );
        let id = JobId::new("job-a");

        let mut seen_terminal = None;
        for _ in 0..6 {
            let handle = client.fetch(&id).await.unwrap();
            if let Some(terminal) = seen_terminal {
                assert_eq!(handle.status, terminal);
            } else if handle.is_terminal() {
                seen_terminal = Some(handle.status);
            }
        }

        assert_eq!(seen_terminal, Some(JobStatus::Success));
    }

    #[tokio::test]
    async fn test_unscripted_id_is_not_found() {
        let client = ScriptedClient::new();
        let err = client.fetch(&JobId::new("nope")).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(client.fetch_count("nope"), 1);
    }
}
