use std::fmt::Write as _;
use std::io::{self, Write};

use crate::domain::{FetchOutcome, Item, RunTally};

/// Sink for per-item outcomes. Purely informational; nothing an observer
/// does can influence the run.
pub trait Observer: Send + Sync {
    fn on_outcome(&self, item: &Item, outcome: &FetchOutcome);
}

pub struct NullObserver;

impl Observer for NullObserver {
    fn on_outcome(&self, _item: &Item, _outcome: &FetchOutcome) {}
}

/// Emits one tracing line per finished item.
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_outcome(&self, item: &Item, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Downloaded => {
                tracing::info!(key = %item.remote_key, size = ?item.expected_size, "downloaded")
            }
            FetchOutcome::Skipped(_) => {
                tracing::debug!(key = %item.remote_key, "skipped, already present")
            }
            FetchOutcome::Failed { error, attempts } => {
                tracing::error!(key = %item.remote_key, attempts, error = %error, "failed")
            }
        }
    }
}

pub fn render_summary(tally: &RunTally) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "DOWNLOAD SUMMARY");
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "Downloaded: {}", tally.downloaded);
    let _ = writeln!(out, "Skipped:    {} (already present)", tally.skipped);
    let _ = writeln!(out, "Failed:     {}", tally.failed);
    let _ = writeln!(out, "Total:      {}", tally.total());
    if let Some(error) = &tally.enumeration_error {
        let _ = writeln!(out, "Enumeration stopped early: {error}");
    }
    if !tally.failures.is_empty() {
        let _ = writeln!(out, "\nFailed items (rerun to retry just these):");
        for failure in &tally.failures {
            let _ = writeln!(
                out,
                "  {} - {} (after {} attempts)",
                failure.remote_key, failure.error, failure.attempts
            );
        }
    }
    let _ = writeln!(out, "{}", "=".repeat(60));
    out
}

pub fn print_summary(tally: &RunTally) -> io::Result<()> {
    io::stdout().write_all(render_summary(tally).as_bytes())
}

pub fn print_json(tally: &RunTally) -> io::Result<()> {
    let json = serde_json::to_string_pretty(tally).map_err(io::Error::other)?;
    let mut stdout = io::stdout();
    stdout.write_all(json.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::domain::FailedItem;

    use super::*;

    #[test]
    fn summary_names_failed_items() {
        let tally = RunTally {
            downloaded: 7,
            skipped: 2,
            failed: 1,
            failures: vec![FailedItem {
                remote_key: "042.zip".to_string(),
                error: "timed out".to_string(),
                attempts: 3,
            }],
            enumeration_error: None,
        };

        let rendered = render_summary(&tally);
        assert!(rendered.contains("Downloaded: 7"));
        assert!(rendered.contains("Skipped:    2"));
        assert!(rendered.contains("042.zip - timed out (after 3 attempts)"));
    }

    #[test]
    fn summary_reports_an_aborted_enumeration() {
        let tally = RunTally {
            enumeration_error: Some("listing returned status 503".to_string()),
            ..RunTally::default()
        };

        assert!(render_summary(&tally).contains("listing returned status 503"));
    }
}
