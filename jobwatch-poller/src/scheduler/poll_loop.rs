//! Poll loop
//!
//! Drives repeated status queries for one job until the job reaches a
//! terminal status, the timeout elapses or the backend fails permanently.
//!
//! ```text
//!   Waiting ──→ Polling ──┬──→ DoneSuccess
//!                 ↑   │   ├──→ DoneFailure
//!                 └───┘   ├──→ DoneCanceled
//!      (non-terminal or   ├──→ TimedOut
//!       transient error)  └──→ AbortedError
//! ```

use jobwatch_client::{ClientError, JobClient};
use jobwatch_core::domain::job::{JobHandle, JobId, JobStatus};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use crate::config::PollConfig;
use crate::error::WatchError;
use crate::scheduler::watch::WatchStream;

/// State of a watch session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollState {
    Waiting,
    Polling,
    DoneSuccess,
    DoneFailure,
    DoneCanceled,
    TimedOut,
    AbortedError,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Waiting | PollState::Polling)
    }
}

impl From<JobStatus> for PollState {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending | JobStatus::Running => PollState::Polling,
            JobStatus::Success => PollState::DoneSuccess,
            JobStatus::Failure => PollState::DoneFailure,
            JobStatus::Revoked => PollState::DoneCanceled,
        }
    }
}

/// Blocking-style watcher for single jobs
///
/// Cheap to clone; clones share the client.
#[derive(Clone)]
pub struct PollLoop {
    client: Arc<dyn JobClient>,
    config: PollConfig,
}

impl PollLoop {
    /// Creates a poll loop, rejecting invalid configurations up front
    pub fn new(client: Arc<dyn JobClient>, config: PollConfig) -> Result<Self, WatchError> {
        config.validate()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Waits until the job reaches a terminal status or `config.timeout` elapses
    ///
    /// A job that failed or was revoked is returned as `Ok`; inspect
    /// `status` to tell outcomes apart.
    pub async fn run(&self, id: &JobId) -> Result<JobHandle, WatchError> {
        let deadline = Instant::now() + self.config.timeout;
        self.run_until(id, deadline).await
    }

    /// Same as [`PollLoop::run`] with an explicit deadline
    pub async fn run_until(&self, id: &JobId, deadline: Instant) -> Result<JobHandle, WatchError> {
        let mut session = self.session(id, deadline)?;

        while let Some(step) = session.advance().await {
            let handle = step?;
            if handle.is_terminal() {
                return Ok(handle);
            }
        }

        Err(WatchError::Aborted(format!(
            "watch of job {} ended without a terminal snapshot",
            id
        )))
    }

    /// Starts a lazy watch yielding one snapshot per poll
    pub fn watch(&self, id: &JobId) -> Result<WatchStream, WatchError> {
        let deadline = Instant::now() + self.config.timeout;
        Ok(WatchStream::new(self.session(id, deadline)?))
    }

    fn session(&self, id: &JobId, deadline: Instant) -> Result<Session, WatchError> {
        if id.is_empty() {
            return Err(WatchError::InvalidJobId(id.to_string()));
        }
        Ok(Session::new(
            Arc::clone(&self.client),
            id.clone(),
            self.config.clone(),
            deadline,
        ))
    }
}

/// One pass of the state machine for one job id
pub(crate) struct Session {
    client: Arc<dyn JobClient>,
    id: JobId,
    config: PollConfig,
    started: Instant,
    deadline: Instant,
    state: PollState,
    last: Option<JobHandle>,
    /// Fetch attempts, transient failures included
    fetches: u32,
    /// Non-terminal snapshots seen so far
    polls: u32,
    span: Span,
}

impl Session {
    pub(crate) fn new(
        client: Arc<dyn JobClient>,
        id: JobId,
        config: PollConfig,
        deadline: Instant,
    ) -> Self {
        let span = info_span!("watch", job_id = %id);
        Self {
            client,
            id,
            config,
            started: Instant::now(),
            deadline,
            state: PollState::Waiting,
            last: None,
            fetches: 0,
            polls: 0,
            span,
        }
    }

    pub(crate) fn id(&self) -> &JobId {
        &self.id
    }

    pub(crate) fn state(&self) -> PollState {
        self.state
    }

    pub(crate) fn last(&self) -> Option<&JobHandle> {
        self.last.as_ref()
    }

    pub(crate) fn fetch_count(&self) -> u32 {
        self.fetches
    }

    /// Runs the machine until the next snapshot or error
    ///
    /// Returns `None` once a terminal state has been reported.
    pub(crate) async fn advance(&mut self) -> Option<Result<JobHandle, WatchError>> {
        if self.state.is_terminal() {
            return None;
        }
        let span = self.span.clone();
        Some(self.step().instrument(span).await)
    }

    async fn step(&mut self) -> Result<JobHandle, WatchError> {
        if self.state == PollState::Polling {
            let delay = self.config.delay_after(self.polls);
            if !self.sleep_within_deadline(delay).await {
                return Err(self.time_out());
            }
        }
        self.state = PollState::Polling;

        loop {
            if Instant::now() >= self.deadline {
                return Err(self.time_out());
            }

            self.fetches += 1;
            let fetched = match time::timeout_at(self.deadline, self.client.fetch(&self.id)).await {
                Ok(fetched) => fetched,
                Err(_) => return Err(self.time_out()),
            };

            match fetched {
                Ok(handle) => return Ok(self.observe(handle)),
                Err(e) if e.is_transient() => {
                    warn!(
                        "Transient error polling job {} (attempt {}): {}",
                        self.id, self.fetches, e
                    );
                    if !self.sleep_within_deadline(self.config.interval).await {
                        return Err(self.time_out());
                    }
                }
                Err(e) => return Err(self.abort(e)),
            }
        }
    }

    fn observe(&mut self, handle: JobHandle) -> JobHandle {
        self.state = PollState::from(handle.status);

        if self.state.is_terminal() {
            info!(
                "Job {} finished with status {} after {} fetch(es)",
                self.id, handle.status, self.fetches
            );
        } else {
            self.polls += 1;
            if let Some(previous) = &self.last {
                if handle.progress < previous.progress {
                    debug!(
                        "Job {} progress went backwards ({} -> {})",
                        self.id, previous.progress, handle.progress
                    );
                }
            }
            debug!(
                "Job {} is {} ({}%)",
                self.id,
                handle.status,
                handle.percent()
            );
        }

        self.last = Some(handle.clone());
        handle
    }

    fn abort(&mut self, err: ClientError) -> WatchError {
        self.state = PollState::AbortedError;

        if err.is_not_found() {
            warn!("Job {} is unknown to the backend", self.id);
            return WatchError::NotFound(self.id.clone());
        }

        error!("Stopped watching job {}: {}", self.id, err);
        WatchError::Client {
            id: self.id.clone(),
            source: err,
        }
    }

    fn time_out(&mut self) -> WatchError {
        self.state = PollState::TimedOut;
        let elapsed = self.started.elapsed();

        warn!(
            "Job {} still {} after {:?}",
            self.id,
            self.last
                .as_ref()
                .map(|h| h.status.as_str())
                .unwrap_or("unobserved"),
            elapsed
        );

        WatchError::Timeout {
            id: self.id.clone(),
            elapsed,
            last: self.last.clone().map(Box::new),
        }
    }

    /// Sleeps for `delay` or until the deadline, whichever comes first
    ///
    /// Returns `false` when the deadline has been reached.
    async fn sleep_within_deadline(&self, delay: Duration) -> bool {
        let wake = (Instant::now() + delay).min(self.deadline);
        time::sleep_until(wake).await;
        Instant::now() < self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backoff;
    use crate::testing::{ScriptedClient, Step};
    use std::time::Instant as StdInstant;

    fn poll_loop(client: &Arc<ScriptedClient>, interval_ms: u64, timeout_ms: u64) -> PollLoop {
        let config = PollConfig::new(Duration::from_millis(timeout_ms))
            .with_interval(Duration::from_millis(interval_ms));
        PollLoop::new(client.clone(), config).unwrap()
    }

    #[test]
    fn test_poll_state_from_status() {
        assert_eq!(PollState::from(JobStatus::Pending), PollState::Polling);
        assert_eq!(PollState::from(JobStatus::Running), PollState::Polling);
        assert_eq!(PollState::from(JobStatus::Success), PollState::DoneSuccess);
        assert_eq!(PollState::from(JobStatus::Failure), PollState::DoneFailure);
        assert_eq!(PollState::from(JobStatus::Revoked), PollState::DoneCanceled);
        assert!(!PollState::Waiting.is_terminal());
        assert!(PollState::TimedOut.is_terminal());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let client = Arc::new(ScriptedClient::new());
        let config = PollConfig::new(Duration::ZERO);
        assert!(matches!(
            PollLoop::new(client, config),
            Err(WatchError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_run_returns_success_after_three_fetches() {
        let client = Arc::new(ScriptedClient::new().script(
            "job-a",
            [
                Step::Status(JobStatus::Pending),
                Step::Status(JobStatus::Pending),
                Step::Status(JobStatus::Success),
            ],
        ));

        let handle = poll_loop(&client, 10, 10_000)
            .run(&JobId::new("job-a"))
            .await
            .unwrap();

        assert_eq!(handle.status, JobStatus::Success);
        assert_eq!(client.fetch_count("job-a"), 3);
    }

    #[tokio::test]
    async fn test_run_times_out_within_bound() {
        let client = Arc::new(
            ScriptedClient::new().script("job-a", [Step::Progress(JobStatus::Pending, 0.1)]),
        );

        let started = StdInstant::now();
        let err = poll_loop(&client, 10, 50)
            .run(&JobId::new("job-a"))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(err.is_timeout(), "expected timeout, got {err:?}");
        assert_eq!(err.job_id().map(JobId::as_str), Some("job-a"));
        assert_eq!(
            err.last_snapshot().map(|h| h.status),
            Some(JobStatus::Pending)
        );
        assert!(elapsed >= Duration::from_millis(50));
        assert!(
            elapsed < Duration::from_millis(60 + 100),
            "took {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn test_run_abandons_hanging_fetch_at_deadline() {
        let client = Arc::new(
            ScriptedClient::new().script("job-a", [Step::Hang(Duration::from_secs(30))]),
        );

        let started = StdInstant::now();
        let err = poll_loop(&client, 10, 50)
            .run(&JobId::new("job-a"))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(err.last_snapshot().is_none());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_run_retries_transient_errors() {
        let client = Arc::new(ScriptedClient::new().script(
            "job-a",
            [
                Step::Transient,
                Step::Transient,
                Step::Transient,
                Step::Status(JobStatus::Success),
            ],
        ));

        let handle = poll_loop(&client, 10, 2_000)
            .run(&JobId::new("job-a"))
            .await
            .unwrap();

        assert_eq!(handle.status, JobStatus::Success);
        assert_eq!(client.fetch_count("job-a"), 4);
    }

    #[tokio::test]
    async fn test_transient_errors_still_bounded_by_timeout() {
        let client = Arc::new(ScriptedClient::new().script("job-a", [Step::Transient]));

        let err = poll_loop(&client, 10, 80)
            .run(&JobId::new("job-a"))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(client.fetch_count("job-a") > 1);
    }

    #[tokio::test]
    async fn test_run_not_found_is_not_retried() {
        let client = Arc::new(ScriptedClient::new());

        let err = poll_loop(&client, 10, 10_000)
            .run(&JobId::new("ghost"))
            .await
            .unwrap_err();

        assert!(matches!(err, WatchError::NotFound(ref id) if id.as_str() == "ghost"));
        assert_eq!(client.fetch_count("ghost"), 1);
    }

    #[tokio::test]
    async fn test_run_aborts_on_permanent_error() {
        let client = Arc::new(ScriptedClient::new().script(
            "job-a",
            [Step::Status(JobStatus::Running), Step::Unauthorized],
        ));

        let err = poll_loop(&client, 10, 10_000)
            .run(&JobId::new("job-a"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WatchError::Client {
                source: ClientError::Unauthorized { .. },
                ..
            }
        ));
        assert_eq!(client.fetch_count("job-a"), 2);
    }

    #[tokio::test]
    async fn test_job_failure_is_returned_as_data() {
        let client = Arc::new(ScriptedClient::new().script(
            "job-a",
            [
                Step::Status(JobStatus::Running),
                Step::Failed("out of memory"),
            ],
        ));

        let handle = poll_loop(&client, 10, 10_000)
            .run(&JobId::new("job-a"))
            .await
            .unwrap();

        assert_eq!(handle.status, JobStatus::Failure);
        assert_eq!(handle.error_message.as_deref(), Some("out of memory"));
    }

    #[tokio::test]
    async fn test_revoked_job_stops_polling() {
        let client = Arc::new(
            ScriptedClient::new().script("job-a", [Step::Status(JobStatus::Revoked)]),
        );

        let handle = poll_loop(&client, 10, 10_000)
            .run(&JobId::new("job-a"))
            .await
            .unwrap();

        assert_eq!(handle.status, JobStatus::Revoked);
        assert_eq!(client.fetch_count("job-a"), 1);
    }

    #[tokio::test]
    async fn test_run_rejects_empty_id() {
        let client = Arc::new(ScriptedClient::new());

        let err = poll_loop(&client, 10, 1_000)
            .run(&JobId::new(""))
            .await
            .unwrap_err();

        assert!(matches!(err, WatchError::InvalidJobId(_)));
    }

    #[tokio::test]
    async fn test_exponential_backoff_spaces_out_polls() {
        let client = Arc::new(ScriptedClient::new().script(
            "job-a",
            [
                Step::Status(JobStatus::Running),
                Step::Status(JobStatus::Running),
                Step::Status(JobStatus::Running),
                Step::Status(JobStatus::Success),
            ],
        ));
        let config = PollConfig::new(Duration::from_secs(5))
            .with_interval(Duration::from_millis(10))
            .with_backoff(Backoff::Exponential {
                factor: 2.0,
                max: Duration::from_secs(1),
            });

        let started = StdInstant::now();
        let handle = PollLoop::new(client.clone(), config)
            .unwrap()
            .run(&JobId::new("job-a"))
            .await
            .unwrap();

        assert_eq!(handle.status, JobStatus::Success);
        // 10ms + 20ms + 40ms between the four fetches
        assert!(started.elapsed() >= Duration::from_millis(70));
    }

    #[tokio::test]
    async fn test_session_tracks_state() {
        let client = Arc::new(ScriptedClient::new().script(
            "job-a",
            [
                Step::Status(JobStatus::Running),
                Step::Status(JobStatus::Success),
            ],
        ));
        let mut session = Session::new(
            client,
            JobId::new("job-a"),
            PollConfig::new(Duration::from_secs(5)).with_interval(Duration::from_millis(5)),
            Instant::now() + Duration::from_secs(5),
        );

        assert_eq!(session.state(), PollState::Waiting);

        session.advance().await.unwrap().unwrap();
        assert_eq!(session.state(), PollState::Polling);

        session.advance().await.unwrap().unwrap();
        assert_eq!(session.state(), PollState::DoneSuccess);
        assert_eq!(session.fetch_count(), 2);

        assert!(session.advance().await.is_none());
        assert_eq!(session.fetch_count(), 2);
    }
}
