//! Tick scheduler that publishes one job per schedule firing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use harvest_broker::QueueManager;
use harvest_core::config::scheduler::SchedulerConfig;
use harvest_core::error::AppError;
use harvest_core::result::AppResult;
use harvest_core::traits::queue::QueueProvider;
use harvest_core::types::{Envelope, Job};

/// Builds and publishes one job envelope per tick.
///
/// Publishing is fire-and-forget: the publisher never queues ticks
/// client-side and never retries a failed publish — a tick that cannot be
/// published is simply lost.
#[derive(Debug)]
pub struct TickPublisher {
    /// Queue manager owned by the scheduling component.
    queue: Arc<QueueManager>,
    /// Name of the work queue.
    work_queue: String,
    /// Job type stamped on every published job.
    job_type: String,
    /// In-process tick counter feeding job id generation.
    seq: AtomicU64,
}

impl TickPublisher {
    /// Create a new tick publisher.
    pub fn new(
        queue: Arc<QueueManager>,
        work_queue: impl Into<String>,
        job_type: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            work_queue: work_queue.into(),
            job_type: job_type.into(),
            seq: AtomicU64::new(0),
        }
    }

    /// Generate a process-unique job id from the tick counter and clock.
    fn next_job_id(&self) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("job-{seq}-{}", Utc::now().timestamp_millis())
    }

    /// Build one job and publish it to the work queue at attempt 0.
    /// Returns the published job id.
    pub async fn publish_tick(&self) -> AppResult<String> {
        let job = Job::new(self.next_job_id(), self.job_type.clone());
        let id = job.id.clone();

        self.queue
            .publish_json(&self.work_queue, &Envelope::first(job))
            .await?;

        tracing::debug!(job_id = %id, queue = %self.work_queue, "Published tick job");
        Ok(id)
    }
}

/// Fixed-interval scheduler driving a [`TickPublisher`].
pub struct TickScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Publisher invoked on every firing
    publisher: Arc<TickPublisher>,
    /// Scheduler configuration
    config: SchedulerConfig,
}

impl std::fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickScheduler").finish()
    }
}

impl TickScheduler {
    /// Create a new tick scheduler.
    pub async fn new(publisher: Arc<TickPublisher>, config: SchedulerConfig) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            publisher,
            config,
        })
    }

    /// Register the repeating tick.
    pub async fn register_tick(&self) -> AppResult<()> {
        let publisher = Arc::clone(&self.publisher);
        let interval = Duration::from_secs(self.config.interval_seconds);

        let job = CronJob::new_repeated_async(interval, move |_uuid, _lock| {
            let publisher = Arc::clone(&publisher);
            Box::pin(async move {
                if let Err(e) = publisher.publish_tick().await {
                    tracing::warn!(error = %e, "Tick publish failed, dropping tick");
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create tick schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add tick schedule: {e}")))?;

        tracing::info!(
            interval_seconds = self.config.interval_seconds,
            job_type = %self.config.job_type,
            "Registered tick schedule"
        );
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Tick scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Tick scheduler shut down");
        Ok(())
    }
}
