//! Job executor — dispatches jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing;

use harvest_core::error::AppError;
use harvest_core::types::Job;

/// Trait for job handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Get the job type this handler processes
    fn job_type(&self) -> &str;

    /// Execute the job
    async fn execute(&self, job: &Job) -> Result<(), JobExecutionError>;
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure — do not retry
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure — may retry
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    /// Whether the retry protocol applies to this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Dispatches jobs to the appropriate handler based on job type
#[derive(Debug)]
pub struct JobExecutor {
    /// Registered job handlers by type
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create a new job executor
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a job handler
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        tracing::info!("Registered job handler for type '{}'", job_type);
        self.handlers.insert(job_type, handler);
    }

    /// Execute a job by dispatching to the correct handler
    pub async fn execute(&self, job: &Job) -> Result<(), JobExecutionError> {
        let handler = self.handlers.get(&job.job_type).ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No handler registered for job type '{}'",
                job.job_type
            ))
        })?;

        handler.execute(job).await
    }

    /// Check if a handler is registered for a job type
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Get the list of registered job types
    pub fn registered_types(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

impl Default for JobExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NoopHandler;

    #[async_trait]
    impl JobHandler for NoopHandler {
        fn job_type(&self) -> &str {
            "noop"
        }

        async fn execute(&self, _job: &Job) -> Result<(), JobExecutionError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatches_to_registered_handler() {
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(NoopHandler));

        assert!(executor.has_handler("noop"));
        let job = Job::new("job-1-1", "noop");
        assert!(executor.execute(&job).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_job_type_is_a_permanent_failure() {
        let executor = JobExecutor::new();
        let job = Job::new("job-1-1", "mystery");

        let error = executor.execute(&job).await.unwrap_err();
        assert!(matches!(error, JobExecutionError::Permanent(_)));
        assert!(!error.is_retryable());
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(JobExecutionError::Transient("timeout".into()).is_retryable());
        assert!(!JobExecutionError::Permanent("bad payload".into()).is_retryable());
        assert!(!JobExecutionError::Internal(AppError::internal("bug")).is_retryable());
    }
}
