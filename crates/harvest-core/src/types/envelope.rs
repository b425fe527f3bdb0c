//! The delivery wrapper carrying a job plus its attempt count.

use serde::{Deserialize, Serialize};

use super::job::Job;

/// On-the-wire representation of a delivery attempt.
///
/// The attempt count rides inside the envelope as a first-class field with a
/// defined default, rather than as loosely-typed out-of-band metadata. A
/// body without an `attempt` field is a first delivery (attempt 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// The wrapped job.
    pub job: Job,
    /// Delivery attempt counter. 0 for a brand-new job; incremented by the
    /// worker on every re-publish, never decremented.
    #[serde(default)]
    pub attempt: u32,
}

impl Envelope {
    /// Wrap a brand-new job for its first delivery.
    pub fn first(job: Job) -> Self {
        Self { job, attempt: 0 }
    }

    /// Re-wrap the job for the next delivery attempt.
    pub fn next(self) -> Self {
        Self {
            job: self.job,
            attempt: self.attempt + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_attempt_defaults_to_zero() {
        let body = r#"{"job":{"id":"job-1-1","type":"collect","createdAt":1700000000000}}"#;
        let envelope: Envelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.attempt, 0);
    }

    #[test]
    fn next_increments_attempt_and_keeps_the_job() {
        let envelope = Envelope::first(Job::new("job-1-1", "collect"));
        let id = envelope.job.id.clone();

        let retried = envelope.next();
        assert_eq!(retried.attempt, 1);
        assert_eq!(retried.job.id, id);

        assert_eq!(retried.next().attempt, 2);
    }
}
