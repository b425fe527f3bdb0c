//! Quarantine record for jobs that exhausted their retry budget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::Job;

/// Entry written to the dead-letter queue.
///
/// Retains the original job unchanged alongside the failure reason and the
/// time of the terminal failure. Never mutated once written; replay is an
/// out-of-band operator concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    /// The original job as it was first published.
    pub job: Job,
    /// Human-readable reason for the terminal failure.
    pub error: String,
    /// When the final attempt failed, as a millisecond timestamp.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub failed_at: DateTime<Utc>,
}

impl DeadLetter {
    /// Record a terminal failure for the given job, stamped now.
    pub fn new(job: Job, error: impl Into<String>) -> Self {
        Self {
            job,
            error: error.into(),
            failed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_matches_queue_contract() {
        let record = DeadLetter::new(Job::new("job-2-9", "collect"), "connection refused");
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["job"]["id"], "job-2-9");
        assert_eq!(value["error"], "connection refused");
        assert!(value["failedAt"].is_i64());
    }
}
