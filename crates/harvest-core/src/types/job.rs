//! The unit of work emitted by the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single unit of work.
///
/// The pipeline treats the job as opaque: `job_type` is only interpreted by
/// the handler registry, and `created_at` is informational — it is never
/// used for ordering or expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Opaque identifier, unique across the producing process lifetime.
    pub id: String,
    /// Tag identifying what the job does (e.g. `"collect"`).
    #[serde(rename = "type")]
    pub job_type: String,
    /// When the job was created, as a millisecond timestamp on the wire.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job with the given id and type, stamped now.
    pub fn new(id: impl Into<String>, job_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            job_type: job_type.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_uses_original_field_names() {
        let job = Job::new("job-1-1700000000000", "collect");
        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(value["id"], "job-1-1700000000000");
        assert_eq!(value["type"], "collect");
        assert!(value["createdAt"].is_i64());
    }

    #[test]
    fn parses_wire_body() {
        let body = r#"{"id":"job-7-1700000000000","type":"collect","createdAt":1700000000000}"#;
        let job: Job = serde_json::from_str(body).unwrap();

        assert_eq!(job.id, "job-7-1700000000000");
        assert_eq!(job.job_type, "collect");
        assert_eq!(job.created_at.timestamp_millis(), 1_700_000_000_000);
    }
}
