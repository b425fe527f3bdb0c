//! Tick scheduler configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the publishing side of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the scheduler runs in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fixed interval between ticks, in seconds.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Job type published on every tick — the work this deployment exists
    /// to trigger.
    #[serde(default = "default_job_type")]
    pub job_type: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_seconds: default_interval(),
            job_type: default_job_type(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u64 {
    30
}

fn default_job_type() -> String {
    "collect".to_string()
}
