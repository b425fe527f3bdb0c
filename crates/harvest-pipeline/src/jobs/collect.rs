//! Collection-run trigger handler.

use std::time::Duration;

use async_trait::async_trait;
use tracing;

use harvest_core::config::collector::CollectorConfig;
use harvest_core::error::AppError;
use harvest_core::result::AppResult;
use harvest_core::types::Job;

use crate::executor::{JobExecutionError, JobHandler};

/// Triggers a collection run for every job it receives.
///
/// The run itself lives in the collector service; this handler only POSTs
/// the job and reports the outcome. Transport errors and non-success
/// statuses are transient failures — the collector may simply be down.
#[derive(Debug)]
pub struct CollectJobHandler {
    /// HTTP client for the collector service.
    client: reqwest::Client,
    /// Collector base URL, without a trailing slash.
    base_url: String,
    /// Job type this handler is registered under.
    job_type: String,
}

impl CollectJobHandler {
    /// Create a new collect handler.
    pub fn new(config: &CollectorConfig, job_type: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            job_type: job_type.into(),
        })
    }
}

#[async_trait]
impl JobHandler for CollectJobHandler {
    fn job_type(&self) -> &str {
        &self.job_type
    }

    async fn execute(&self, job: &Job) -> Result<(), JobExecutionError> {
        let url = format!("{}/runs", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(job)
            .send()
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Collector request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(JobExecutionError::Transient(format!(
                "Collector returned {}",
                response.status()
            )));
        }

        tracing::info!(job_id = %job.id, "Collection run triggered");
        Ok(())
    }
}
