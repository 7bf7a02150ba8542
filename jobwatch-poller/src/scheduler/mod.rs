//! Scheduler layer
//!
//! This layer drives status queries for remote jobs: the poll loop state
//! machine, its lazy stream form, and the orchestrator fanning both out
//! over batches of jobs.

pub mod orchestrator;
pub mod poll_loop;
pub mod watch;

pub use orchestrator::{JobOutcome, Orchestrator, OutcomeSummary, Submission};
pub use poll_loop::{PollLoop, PollState};
pub use watch::{JobStream, WatchStream};
