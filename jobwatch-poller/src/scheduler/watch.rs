//! Watch streams
//!
//! A lazy view of the poll loop: one snapshot per successful poll, pulled
//! by the consumer. Stopping early is a normal way to finish a watch.

use jobwatch_core::domain::job::{JobHandle, JobId};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::WatchError;
use crate::scheduler::poll_loop::{PollState, Session};

/// Pull-based sequence of snapshots for one job
///
/// Transient errors are retried inside [`WatchStream::next`] and never
/// surface. After the terminal snapshot, a timeout or an error, `next`
/// returns `None`; a finished stream cannot be restarted.
///
/// Dropping the stream, or a pending `next` future, cancels the request in
/// flight. Nothing is sent to the backend on cancellation.
pub struct WatchStream {
    session: Session,
}

impl WatchStream {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    /// Waits for the next snapshot
    pub async fn next(&mut self) -> Option<Result<JobHandle, WatchError>> {
        self.session.advance().await
    }

    pub fn job_id(&self) -> &JobId {
        self.session.id()
    }

    pub fn state(&self) -> PollState {
        self.session.state()
    }

    /// Most recent snapshot, if any
    pub fn last(&self) -> Option<&JobHandle> {
        self.session.last()
    }

    pub fn fetch_count(&self) -> u32 {
        self.session.fetch_count()
    }

    /// Moves the watch onto its own task and exposes it as a [`Stream`]
    ///
    /// The task runs at most one snapshot ahead of the consumer and is
    /// aborted when the returned stream is dropped.
    pub fn into_stream(mut self) -> JobStream {
        let (tx, rx) = mpsc::channel(1);

        let task = tokio::spawn(async move {
            while let Some(item) = self.next().await {
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        });

        JobStream {
            inner: ReceiverStream::new(rx),
            task,
        }
    }
}

/// [`Stream`] of snapshots backed by a watch task
pub struct JobStream {
    inner: ReceiverStream<Result<JobHandle, WatchError>>,
    task: JoinHandle<()>,
}

impl Stream for JobStream {
    type Item = Result<JobHandle, WatchError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for JobStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
