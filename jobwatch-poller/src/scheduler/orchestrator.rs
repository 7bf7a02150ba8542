//! Orchestrator
//!
//! Submits batches of jobs and watches each one on its own task. A job that
//! fails does not stop the others, and every input key gets an outcome.

use jobwatch_client::{JobClient, JobSubmitter};
use jobwatch_core::domain::job::{JobHandle, JobId, JobStatus};
use jobwatch_core::dto::job::SubmitJob;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::config::OrchestratorConfig;
use crate::error::WatchError;
use crate::scheduler::poll_loop::{PollLoop, PollState};

/// A unit of work to submit, identified by a caller-chosen key
#[derive(Debug, Clone)]
pub struct Submission {
    pub key: String,
    pub request: SubmitJob,
}

impl Submission {
    pub fn new(key: impl Into<String>, request: SubmitJob) -> Self {
        Self {
            key: key.into(),
            request,
        }
    }
}

/// Final result for one key of a batch
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// The job reached a terminal status (which may be a failure)
    Finished(JobHandle),
    /// The batch deadline elapsed while the job was still running
    TimedOut { id: JobId, last: Option<JobHandle> },
    /// Watching stopped on a permanent error
    Aborted { id: Option<JobId>, error: String },
    /// The job never got an id
    Rejected { error: String },
}

impl JobOutcome {
    pub fn state(&self) -> PollState {
        match self {
            JobOutcome::Finished(handle) => PollState::from(handle.status),
            JobOutcome::TimedOut { .. } => PollState::TimedOut,
            JobOutcome::Aborted { .. } | JobOutcome::Rejected { .. } => PollState::AbortedError,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Finished(handle) if handle.status == JobStatus::Success)
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            JobOutcome::Finished(handle) => Some(&handle.id),
            JobOutcome::TimedOut { id, .. } => Some(id),
            JobOutcome::Aborted { id, .. } => id.as_ref(),
            JobOutcome::Rejected { .. } => None,
        }
    }

    /// Terminal snapshot, or the last one seen before a timeout
    pub fn snapshot(&self) -> Option<&JobHandle> {
        match self {
            JobOutcome::Finished(handle) => Some(handle),
            JobOutcome::TimedOut { last, .. } => last.as_ref(),
            _ => None,
        }
    }

    fn from_watch(id: JobId, result: Result<JobHandle, WatchError>) -> Self {
        match result {
            Ok(handle) => JobOutcome::Finished(handle),
            Err(WatchError::Timeout { last, .. }) => JobOutcome::TimedOut {
                id,
                last: last.map(|handle| *handle),
            },
            Err(e) => JobOutcome::Aborted {
                id: Some(id),
                error: e.to_string(),
            },
        }
    }
}

/// Outcome counts of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub canceled: usize,
    pub timed_out: usize,
    pub aborted: usize,
}

impl OutcomeSummary {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a JobOutcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome.state() {
                PollState::DoneSuccess => summary.succeeded += 1,
                PollState::DoneFailure => summary.failed += 1,
                PollState::DoneCanceled => summary.canceled += 1,
                PollState::TimedOut => summary.timed_out += 1,
                _ => summary.aborted += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.canceled + self.timed_out + self.aborted
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total()
    }
}

enum Source {
    Submit(SubmitJob),
    Existing(JobId),
}

/// Fans out submissions and watches, then aggregates their outcomes
pub struct Orchestrator {
    submitter: Arc<dyn JobSubmitter>,
    poll_loop: PollLoop,
    max_concurrent: usize,
}

impl Orchestrator {
    /// Creates an orchestrator, rejecting invalid configurations up front
    pub fn new(
        submitter: Arc<dyn JobSubmitter>,
        client: Arc<dyn JobClient>,
        config: OrchestratorConfig,
    ) -> Result<Self, WatchError> {
        config.validate()?;
        Ok(Self {
            submitter,
            poll_loop: PollLoop::new(client, config.poll)?,
            max_concurrent: config.max_concurrent,
        })
    }

    /// Submits every request and waits for all of them
    ///
    /// The poll timeout bounds the whole batch. Keys are unique in the
    /// result: a repeated key gets a `#n` suffix.
    pub async fn run_many<I>(&self, submissions: I) -> BTreeMap<String, JobOutcome>
    where
        I: IntoIterator<Item = Submission>,
    {
        let work = submissions
            .into_iter()
            .map(|s| (s.key, Source::Submit(s.request)));
        self.fan_out(work).await
    }

    /// Watches already-submitted jobs the same way [`Orchestrator::run_many`] does
    pub async fn watch_all<I>(&self, jobs: I) -> BTreeMap<String, JobOutcome>
    where
        I: IntoIterator<Item = (String, JobId)>,
    {
        let work = jobs.into_iter().map(|(key, id)| (key, Source::Existing(id)));
        self.fan_out(work).await
    }

    async fn fan_out(
        &self,
        work: impl Iterator<Item = (String, Source)>,
    ) -> BTreeMap<String, JobOutcome> {
        let deadline = Instant::now() + self.poll_loop.config().timeout;
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();
        let mut pending = BTreeSet::new();

        for (key, source) in work {
            let key = unique_key(&pending, key);
            pending.insert(key.clone());

            let submitter = Arc::clone(&self.submitter);
            let poll_loop = self.poll_loop.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let outcome =
                    Self::execute(&key, source, submitter, poll_loop, semaphore, deadline).await;
                (key, outcome)
            });
        }

        info!("Watching {} job(s)", pending.len());

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, outcome)) => {
                    debug!("{} -> {:?}", key, outcome.state());
                    pending.remove(&key);
                    results.insert(key, outcome);
                }
                Err(e) => error!("Watch task panicked: {}", e),
            }
        }

        // Keys whose task panicked still get an entry
        for key in pending {
            results.insert(
                key,
                JobOutcome::Aborted {
                    id: None,
                    error: "watch task panicked".to_string(),
                },
            );
        }

        results
    }

    /// Submits (if needed) and watches a single job
    async fn execute(
        key: &str,
        source: Source,
        submitter: Arc<dyn JobSubmitter>,
        poll_loop: PollLoop,
        semaphore: Arc<Semaphore>,
        deadline: Instant,
    ) -> JobOutcome {
        // Held until the job is terminal
        let permit = match time::timeout_at(deadline, semaphore.acquire_owned()).await {
            Ok(Ok(permit)) if Instant::now() < deadline => Some(permit),
            Ok(Ok(_)) | Err(_) => None,
            Ok(Err(_)) => {
                return JobOutcome::Rejected {
                    error: "scheduler shut down".to_string(),
                };
            }
        };
        let Some(_permit) = permit else {
            warn!("Deadline elapsed before {} could start", key);
            return match source {
                Source::Existing(id) => JobOutcome::TimedOut { id, last: None },
                Source::Submit(_) => JobOutcome::Rejected {
                    error: "deadline elapsed before submission".to_string(),
                },
            };
        };

        let id = match source {
            Source::Existing(id) => id,
            Source::Submit(request) => {
                match time::timeout_at(deadline, submitter.submit(&request)).await {
                    Ok(Ok(id)) => {
                        info!("Submitted {} as job {}", key, id);
                        id
                    }
                    Ok(Err(e)) => {
                        warn!("Submission of {} failed: {}", key, e);
                        return JobOutcome::Rejected {
                            error: e.to_string(),
                        };
                    }
                    Err(_) => {
                        warn!("Deadline elapsed while submitting {}", key);
                        return JobOutcome::Rejected {
                            error: "deadline elapsed during submission".to_string(),
                        };
                    }
                }
            }
        };

        let result = poll_loop.run_until(&id, deadline).await;
        JobOutcome::from_watch(id, result)
    }
}

fn unique_key(taken: &BTreeSet<String>, key: String) -> String {
    if !taken.contains(&key) {
        return key;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}#{}", key, n);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
