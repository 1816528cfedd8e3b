use camino::Utf8PathBuf;
use serde::Serialize;

/// One remote-fetchable unit of work. Immutable once enumerated; identity
/// is the remote key.
#[derive(Debug, Clone)]
pub struct Item {
    pub remote_key: String,
    pub destination_path: Utf8PathBuf,
    pub expected_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded,
    Skipped(SkipReason),
    Failed { error: String, attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyExists,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    pub remote_key: String,
    pub error: String,
    pub attempts: u32,
}

/// Aggregate counters for one engine run, plus the failures in completion
/// order so a rerun can name what is still missing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunTally {
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
    pub failures: Vec<FailedItem>,
    pub enumeration_error: Option<String>,
}

impl RunTally {
    pub fn record(&mut self, item: &Item, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Downloaded => self.downloaded += 1,
            FetchOutcome::Skipped(_) => self.skipped += 1,
            FetchOutcome::Failed { error, attempts } => {
                self.failed += 1;
                self.failures.push(FailedItem {
                    remote_key: item.remote_key.clone(),
                    error: error.clone(),
                    attempts: *attempts,
                });
            }
        }
    }

    pub fn total(&self) -> u64 {
        self.downloaded + self.skipped + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.enumeration_error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str) -> Item {
        Item {
            remote_key: key.to_string(),
            destination_path: Utf8PathBuf::from(format!("/tmp/{key}")),
            expected_size: None,
        }
    }

    #[test]
    fn tally_categories_sum_to_total() {
        let mut tally = RunTally::default();
        tally.record(&item("a"), &FetchOutcome::Downloaded);
        tally.record(&item("b"), &FetchOutcome::Skipped(SkipReason::AlreadyExists));
        tally.record(
            &item("c"),
            &FetchOutcome::Failed {
                error: "boom".to_string(),
                attempts: 3,
            },
        );

        assert_eq!(tally.total(), 3);
        assert_eq!(tally.downloaded, 1);
        assert_eq!(tally.skipped, 1);
        assert_eq!(tally.failed, 1);
        assert!(!tally.is_clean());
    }

    #[test]
    fn failures_keep_key_and_attempts() {
        let mut tally = RunTally::default();
        tally.record(
            &item("007.zip"),
            &FetchOutcome::Failed {
                error: "timed out".to_string(),
                attempts: 3,
            },
        );

        assert_eq!(tally.failures.len(), 1);
        assert_eq!(tally.failures[0].remote_key, "007.zip");
        assert_eq!(tally.failures[0].attempts, 3);
    }
}
