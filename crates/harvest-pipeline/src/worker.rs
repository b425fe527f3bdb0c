//! Worker — consumes deliveries one at a time and drives the retry protocol.
//!
//! Every delivery is settled on exactly one path: acknowledged after
//! success, acknowledged after a compensating requeue or dead-letter
//! publish, acknowledged and dropped when unparseable, or returned to the
//! queue when the compensating publish itself fails. Redelivery is always
//! an explicit re-publish carrying the incremented attempt count, never a
//! broker-level negative acknowledgement.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing;

use harvest_broker::QueueManager;
use harvest_core::config::broker::BrokerConfig;
use harvest_core::config::worker::WorkerConfig;
use harvest_core::error::AppError;
use harvest_core::result::AppResult;
use harvest_core::traits::queue::{Delivery, QueueProvider};
use harvest_core::types::{DeadLetter, Envelope};

use crate::executor::{JobExecutionError, JobExecutor};

/// Terminal outcome of a single delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Execution succeeded; the delivery was acknowledged.
    Completed,
    /// Execution failed; the job re-entered the work queue at the given
    /// attempt count and the original delivery was acknowledged.
    Requeued(u32),
    /// The retry budget was exhausted; the job was quarantined on the
    /// dead-letter queue.
    DeadLettered,
    /// The body did not parse as a job envelope; acknowledged and
    /// discarded, never retried.
    Dropped,
    /// A compensating publish failed; the delivery was returned to the
    /// queue for redelivery.
    Redelivered,
}

/// Consumes the work queue with at most one delivery in flight.
///
/// The receive→execute→settle loop is strictly sequential, so a single
/// worker never has two job executions in flight; scaling throughput means
/// running more worker processes against the same queue.
pub struct Worker {
    /// Queue manager owned by this worker.
    queue: Arc<QueueManager>,
    /// Job executor for dispatching.
    executor: Arc<JobExecutor>,
    /// Worker configuration.
    config: WorkerConfig,
    /// Broker settings (queue names, timeouts).
    broker: BrokerConfig,
    /// Worker identifier for logging.
    worker_id: String,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("worker_id", &self.worker_id)
            .finish()
    }
}

impl Worker {
    /// Create a new worker.
    pub fn new(
        queue: Arc<QueueManager>,
        executor: Arc<JobExecutor>,
        config: WorkerConfig,
        broker: BrokerConfig,
        worker_id: String,
    ) -> Self {
        Self {
            queue,
            executor,
            config,
            broker,
            worker_id,
        }
    }

    /// Requeue deliveries stranded in flight by a previous crash.
    pub async fn recover(&self) -> AppResult<usize> {
        self.queue.recover(&self.broker.work_queue).await
    }

    /// Run until the cancel signal flips to `true`.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            worker_id = %self.worker_id,
            queue = %self.broker.work_queue,
            max_attempts = self.config.max_attempts,
            "Worker started"
        );

        match self.recover().await {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "Recovered in-flight deliveries"),
            Err(e) => tracing::error!(error = %e, "In-flight recovery failed"),
        }

        let reconnect_delay = Duration::from_secs(self.broker.reconnect_delay_seconds);
        let receive_timeout = Duration::from_secs(self.broker.receive_timeout_seconds);

        loop {
            if *cancel.borrow() {
                tracing::info!(worker_id = %self.worker_id, "Worker received shutdown signal");
                break;
            }

            // Only the idle receive races the cancel signal. Once a
            // delivery is in hand it is processed to a terminal outcome
            // before shutdown is honored.
            let received = tokio::select! {
                _ = cancel.changed() => continue,
                result = self.queue.receive(&self.broker.work_queue, receive_timeout) => result,
            };

            match received {
                Ok(Some(delivery)) => {
                    let outcome = self.process(delivery).await;
                    tracing::debug!(?outcome, "Delivery settled");
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Broker receive failed, waiting before retry");
                    tokio::select! {
                        _ = cancel.changed() => {}
                        _ = time::sleep(reconnect_delay) => {}
                    }
                }
            }
        }

        tracing::info!(worker_id = %self.worker_id, "Worker shut down");
    }

    /// Receive and settle at most one delivery.
    ///
    /// Returns `Ok(None)` when no message arrived within the receive
    /// timeout. Errors only surface from the receive call itself; every
    /// received delivery is settled and reported as an outcome.
    pub async fn process_one(&self) -> AppResult<Option<DeliveryOutcome>> {
        let timeout = Duration::from_secs(self.broker.receive_timeout_seconds);
        match self.queue.receive(&self.broker.work_queue, timeout).await? {
            Some(delivery) => Ok(Some(self.process(delivery).await)),
            None => Ok(None),
        }
    }

    async fn process(&self, delivery: Delivery) -> DeliveryOutcome {
        let envelope: Envelope = match serde_json::from_str(&delivery.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                // A malformed payload cannot become valid by retrying:
                // settle it and move on without touching either queue.
                tracing::warn!(error = %e, "Discarding unparseable message");
                self.settle(&delivery).await;
                return DeliveryOutcome::Dropped;
            }
        };

        tracing::info!(
            job_id = %envelope.job.id,
            job_type = %envelope.job.job_type,
            attempt = envelope.attempt,
            "Processing job"
        );

        match self.executor.execute(&envelope.job).await {
            Ok(()) => {
                tracing::info!(job_id = %envelope.job.id, "Job completed");
                self.settle(&delivery).await;
                DeliveryOutcome::Completed
            }
            Err(error) => self.handle_failure(&delivery, envelope, error).await,
        }
    }

    async fn handle_failure(
        &self,
        delivery: &Delivery,
        envelope: Envelope,
        error: JobExecutionError,
    ) -> DeliveryOutcome {
        let reason = error.to_string();
        let attempt = envelope.attempt;

        if error.is_retryable() && attempt + 1 < self.config.max_attempts {
            let retry = envelope.next();
            match self
                .queue
                .publish_json(&self.broker.work_queue, &retry)
                .await
            {
                Ok(()) => {
                    tracing::warn!(
                        job_id = %retry.job.id,
                        attempt,
                        next_attempt = retry.attempt,
                        error = %reason,
                        "Job failed, requeued"
                    );
                    self.settle(delivery).await;
                    DeliveryOutcome::Requeued(retry.attempt)
                }
                Err(publish_error) => self.redeliver(delivery, &publish_error).await,
            }
        } else {
            let record = DeadLetter::new(envelope.job, reason);
            match self
                .queue
                .publish_json(&self.broker.dead_letter_queue, &record)
                .await
            {
                Ok(()) => {
                    tracing::error!(
                        job_id = %record.job.id,
                        attempt,
                        error = %record.error,
                        "Job dead-lettered"
                    );
                    self.settle(delivery).await;
                    DeliveryOutcome::DeadLettered
                }
                Err(publish_error) => self.redeliver(delivery, &publish_error).await,
            }
        }
    }

    /// When a compensating publish cannot be confirmed, return the original
    /// delivery to the queue: a possible duplicate execution is preferred
    /// over a silent loss.
    async fn redeliver(&self, delivery: &Delivery, publish_error: &AppError) -> DeliveryOutcome {
        tracing::error!(
            error = %publish_error,
            "Compensating publish failed, returning delivery to the queue"
        );
        if let Err(e) = self.queue.nack(delivery).await {
            tracing::error!(
                error = %e,
                "Failed to return delivery; it stays in flight until recovery"
            );
        }
        DeliveryOutcome::Redelivered
    }

    async fn settle(&self, delivery: &Delivery) {
        if let Err(e) = self.queue.ack(delivery).await {
            tracing::error!(error = %e, "Failed to acknowledge delivery");
        }
    }
}
