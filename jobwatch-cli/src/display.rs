//! Terminal output helpers

use colored::*;
use jobwatch_core::domain::job::{JobHandle, JobStatus};
use jobwatch_poller::{JobOutcome, OutcomeSummary, WatchError};
use std::collections::BTreeMap;

/// Colorize job status for display
pub fn colorize_status(status: &JobStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Success => status_str.green(),
        JobStatus::Failure => status_str.red(),
        JobStatus::Revoked => status_str.dimmed(),
    }
}

/// Fixed-width progress bar, e.g. `[#####.....]  50%`
pub fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(width - filled),
        (progress * 100.0).round() as u8
    )
}

/// Print one line per snapshot while watching
pub fn print_snapshot_line(handle: &JobHandle) {
    println!(
        "{} {} {} {}",
        handle
            .observed_at
            .format("%H:%M:%S")
            .to_string()
            .dimmed(),
        handle.id.to_string().cyan(),
        progress_bar(handle.progress, 20),
        colorize_status(&handle.status)
    );
}

/// Print detailed job information
pub fn print_job_details(handle: &JobHandle) {
    println!("{}", "Job Details:".bold());
    println!("  ID:        {}", handle.id.to_string().cyan());
    println!("  Status:    {}", colorize_status(&handle.status));
    println!("  Progress:  {}", progress_bar(handle.progress, 20));
    println!(
        "  Observed:  {}",
        handle.observed_at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(error) = &handle.error_message {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }

    if !handle.extras.is_empty() {
        println!("\n{}", "Results:".bold());
        for (task, value) in &handle.extras {
            match serde_json::to_string_pretty(value) {
                Ok(pretty) => println!("  {} = {}", task.cyan(), pretty),
                Err(_) => println!("  {} = {:?}", task.cyan(), value),
            }
        }
    }
}

/// Print why a watch stopped without a terminal snapshot
pub fn print_watch_error(err: &WatchError) {
    eprintln!("{} {}", "✗".red(), err);
    if let Some(last) = err.last_snapshot() {
        eprintln!(
            "  last seen {} at {}",
            colorize_status(&last.status),
            last.observed_at.format("%H:%M:%S")
        );
    }
}

/// Print a table of batch outcomes followed by totals
pub fn print_outcomes(outcomes: &BTreeMap<String, JobOutcome>) {
    let width = outcomes.keys().map(|k| k.len()).max().unwrap_or(0).max(3);

    for (key, outcome) in outcomes {
        let id = outcome
            .job_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());

        let detail = match outcome {
            JobOutcome::Finished(handle) => match &handle.error_message {
                Some(error) => format!("{} {}", colorize_status(&handle.status), error.red()),
                None => colorize_status(&handle.status).to_string(),
            },
            JobOutcome::TimedOut { last, .. } => match last {
                Some(handle) => format!(
                    "{} (last {} {}%)",
                    "TIMED_OUT".red(),
                    handle.status,
                    handle.percent()
                ),
                None => format!("{} (never observed)", "TIMED_OUT".red()),
            },
            JobOutcome::Aborted { error, .. } => format!("{} {}", "ABORTED".red(), error),
            JobOutcome::Rejected { error } => format!("{} {}", "REJECTED".red(), error),
        };

        println!("  {:<width$}  {}  {}", key, id.dimmed(), detail, width = width);
    }

    let summary = OutcomeSummary::from_outcomes(outcomes.values());
    println!();
    println!(
        "{} {} succeeded, {} failed, {} canceled, {} timed out, {} aborted",
        format!("{} job(s):", summary.total()).bold(),
        summary.succeeded.to_string().green(),
        summary.failed.to_string().red(),
        summary.canceled,
        summary.timed_out,
        summary.aborted
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 10), "[..........]   0%");
        assert_eq!(progress_bar(0.5, 10), "[#####.....]  50%");
        assert_eq!(progress_bar(1.0, 10), "[##########] 100%");
    }
}
