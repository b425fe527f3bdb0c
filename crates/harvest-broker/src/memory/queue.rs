//! In-memory queue implementation.
//!
//! Queues are mutex-guarded deques with a notify wake-up for blocked
//! receivers. Deliveries move into a receipt-keyed in-flight table until
//! settled, mirroring the Redis provider's processing list. Not durable
//! across process restarts.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use harvest_core::error::AppError;
use harvest_core::result::AppResult;
use harvest_core::traits::queue::{Delivery, QueueProvider};

#[derive(Debug, Default)]
struct Inner {
    /// Message bodies per queue, oldest at the front.
    queues: HashMap<String, VecDeque<String>>,
    /// Unsettled deliveries by receipt.
    in_flight: HashMap<String, InFlight>,
}

#[derive(Debug)]
struct InFlight {
    queue: String,
    body: String,
}

/// In-memory queue provider.
#[derive(Debug, Default)]
pub struct MemoryQueueProvider {
    inner: Mutex<Inner>,
    /// Wakes one blocked receiver when a message arrives.
    notify: Notify,
    next_receipt: AtomicU64,
}

impl MemoryQueueProvider {
    /// Create a new empty in-memory provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages waiting in a queue.
    pub fn len(&self, queue: &str) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.queues.get(queue).map_or(0, VecDeque::len)
    }

    /// Whether a queue has no waiting messages.
    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }

    /// Number of unsettled deliveries across all queues.
    pub fn in_flight_len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.in_flight.len()
    }

    fn try_pop(&self, queue: &str) -> Option<Delivery> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let body = inner.queues.get_mut(queue)?.pop_front()?;

        let receipt = self.next_receipt.fetch_add(1, Ordering::Relaxed).to_string();
        inner.in_flight.insert(
            receipt.clone(),
            InFlight {
                queue: queue.to_string(),
                body: body.clone(),
            },
        );

        Some(Delivery {
            queue: queue.to_string(),
            body,
            receipt,
        })
    }
}

#[async_trait]
impl QueueProvider for MemoryQueueProvider {
    async fn declare(&self, queue: &str) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.queues.entry(queue.to_string()).or_default();
        debug!(queue, "Declared queue");
        Ok(())
    }

    async fn publish(&self, queue: &str, body: &str) -> AppResult<()> {
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner
                .queues
                .entry(queue.to_string())
                .or_default()
                .push_back(body.to_string());
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn receive(&self, queue: &str, timeout: Duration) -> AppResult<Option<Delivery>> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register for wake-up before checking, so a publish racing the
            // check is not missed.
            let notified = self.notify.notified();

            if let Some(delivery) = self.try_pop(queue) {
                return Ok(Some(delivery));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let _ = tokio::time::timeout(deadline - now, notified).await;
        }
    }

    async fn ack(&self, delivery: &Delivery) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.in_flight.remove(&delivery.receipt).is_none() {
            return Err(AppError::broker(format!(
                "Delivery from '{}' is not in flight",
                delivery.queue
            )));
        }
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> AppResult<()> {
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let entry = inner.in_flight.remove(&delivery.receipt).ok_or_else(|| {
                AppError::broker(format!(
                    "Delivery from '{}' is not in flight",
                    delivery.queue
                ))
            })?;
            inner
                .queues
                .entry(entry.queue)
                .or_default()
                .push_back(entry.body);
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn recover(&self, queue: &str) -> AppResult<usize> {
        let count = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let receipts: Vec<String> = inner
                .in_flight
                .iter()
                .filter(|(_, entry)| entry.queue == queue)
                .map(|(receipt, _)| receipt.clone())
                .collect();

            for receipt in &receipts {
                if let Some(entry) = inner.in_flight.remove(receipt) {
                    inner
                        .queues
                        .entry(entry.queue)
                        .or_default()
                        .push_back(entry.body);
                }
            }
            receipts.len()
        };

        if count > 0 {
            self.notify.notify_one();
        }
        Ok(count)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let provider = MemoryQueueProvider::new();
        provider.publish("tasks", "first").await.unwrap();
        provider.publish("tasks", "second").await.unwrap();

        let a = provider
            .receive("tasks", Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        let b = provider
            .receive("tasks", Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(a.body, "first");
        assert_eq!(b.body, "second");
    }

    #[tokio::test]
    async fn receive_times_out_on_empty_queue() {
        let provider = MemoryQueueProvider::new();
        let result = provider
            .receive("tasks", Duration::from_millis(10))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn ack_settles_exactly_once() {
        let provider = MemoryQueueProvider::new();
        provider.publish("tasks", "body").await.unwrap();

        let delivery = provider
            .receive("tasks", Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(provider.in_flight_len(), 1);

        provider.ack(&delivery).await.unwrap();
        assert_eq!(provider.in_flight_len(), 0);

        // A second settle of the same delivery is an error.
        assert!(provider.ack(&delivery).await.is_err());
    }

    #[tokio::test]
    async fn nack_returns_message_to_the_back_of_the_queue() {
        let provider = MemoryQueueProvider::new();
        provider.publish("tasks", "first").await.unwrap();
        provider.publish("tasks", "second").await.unwrap();

        let delivery = provider
            .receive("tasks", Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        provider.nack(&delivery).await.unwrap();

        let next = provider
            .receive("tasks", Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.body, "second");

        let requeued = provider
            .receive("tasks", Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(requeued.body, "first");
    }

    #[tokio::test]
    async fn recover_requeues_unsettled_deliveries() {
        let provider = MemoryQueueProvider::new();
        provider.publish("tasks", "orphan").await.unwrap();

        let _delivery = provider
            .receive("tasks", Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert!(provider.is_empty("tasks"));

        let count = provider.recover("tasks").await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(provider.len("tasks"), 1);
        assert_eq!(provider.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn receive_wakes_on_publish() {
        let provider = std::sync::Arc::new(MemoryQueueProvider::new());

        let receiver = std::sync::Arc::clone(&provider);
        let handle =
            tokio::spawn(async move { receiver.receive("tasks", Duration::from_secs(5)).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        provider.publish("tasks", "late").await.unwrap();

        let delivery = handle.await.unwrap().unwrap().unwrap();
        assert_eq!(delivery.body, "late");
    }
}
