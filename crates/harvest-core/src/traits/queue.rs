//! Queue provider trait for pluggable broker backends.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// A message handed to a consumer, plus the receipt needed to settle it.
///
/// A delivery stays on the broker's in-flight ledger until it is either
/// acknowledged (removed for good) or negatively acknowledged (returned to
/// its queue for redelivery). Dropping a `Delivery` without settling it
/// leaves the message in-flight; [`QueueProvider::recover`] sweeps such
/// orphans back onto the queue after a crash.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// The queue this message was consumed from.
    pub queue: String,
    /// Raw message body (JSON text).
    pub body: String,
    /// Provider-opaque receipt identifying this delivery.
    pub receipt: String,
}

/// Trait for queue backends (Redis or in-memory).
///
/// Queues are durable named channels of string bodies; durability is
/// delegated entirely to the backend. Consumers pull one message at a time
/// with [`receive`](QueueProvider::receive) — holding at most one
/// unsettled delivery per consumer loop is the pipeline's concurrency
/// bound, equivalent to a prefetch limit of 1.
#[async_trait]
pub trait QueueProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Declare a queue. Idempotent — safe to call on every startup.
    async fn declare(&self, queue: &str) -> AppResult<()>;

    /// Append a message to the back of a queue.
    async fn publish(&self, queue: &str, body: &str) -> AppResult<()>;

    /// Pull the next message from a queue into the in-flight ledger.
    /// Returns `None` if no message arrived within `timeout`.
    async fn receive(&self, queue: &str, timeout: Duration) -> AppResult<Option<Delivery>>;

    /// Settle a delivery for good. Errors if the delivery is not in flight
    /// (e.g. already settled).
    async fn ack(&self, delivery: &Delivery) -> AppResult<()>;

    /// Return a delivery to the back of its queue for redelivery.
    async fn nack(&self, delivery: &Delivery) -> AppResult<()>;

    /// Move deliveries orphaned in the in-flight ledger by a previous crash
    /// back onto the queue. Returns the number of messages requeued.
    async fn recover(&self, queue: &str) -> AppResult<usize>;

    /// Publish a typed message by serializing to JSON.
    async fn publish_json<T: serde::Serialize + Send + Sync>(
        &self,
        queue: &str,
        value: &T,
    ) -> AppResult<()>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value)?;
        self.publish(queue, &json).await
    }

    /// Check that the broker is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
