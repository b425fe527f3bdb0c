//! Shared helpers for pipeline integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use harvest_broker::QueueManager;
use harvest_broker::memory::MemoryQueueProvider;
use harvest_core::config::broker::BrokerConfig;
use harvest_core::error::AppError;
use harvest_core::result::AppResult;
use harvest_core::traits::queue::{Delivery, QueueProvider};
use harvest_core::types::Envelope;

pub const WORK_QUEUE: &str = "tasks";
pub const DEAD_LETTER_QUEUE: &str = "failed_tasks";

/// Broker settings pointed at the in-memory provider with short timeouts.
pub fn broker_config() -> BrokerConfig {
    BrokerConfig {
        provider: "memory".to_string(),
        receive_timeout_seconds: 1,
        reconnect_delay_seconds: 1,
        ..Default::default()
    }
}

/// An in-memory provider plus a manager wrapping it.
pub struct Rig {
    pub provider: Arc<MemoryQueueProvider>,
    pub queue: Arc<QueueManager>,
}

pub fn rig() -> Rig {
    let provider = Arc::new(MemoryQueueProvider::new());
    let queue = Arc::new(QueueManager::from_provider(
        Arc::clone(&provider) as Arc<dyn QueueProvider>
    ));
    Rig { provider, queue }
}

/// Pop one message off a queue, parse it as the given type, and settle it.
pub async fn pop_json<T: serde::de::DeserializeOwned>(
    provider: &MemoryQueueProvider,
    queue: &str,
) -> T {
    let delivery = provider
        .receive(queue, Duration::from_millis(100))
        .await
        .unwrap()
        .expect("queue should hold a message");
    let parsed = serde_json::from_str(&delivery.body).unwrap();
    provider.ack(&delivery).await.unwrap();
    parsed
}

/// Pop one envelope off a queue.
pub async fn pop_envelope(provider: &MemoryQueueProvider, queue: &str) -> Envelope {
    pop_json(provider, queue).await
}

/// Queue provider whose publishes can be switched off, simulating a broker
/// outage between the ack decision and the compensating publish.
#[derive(Debug)]
pub struct OutageProvider {
    inner: Arc<MemoryQueueProvider>,
    publishes_down: AtomicBool,
}

impl OutageProvider {
    pub fn new(inner: Arc<MemoryQueueProvider>) -> Self {
        Self {
            inner,
            publishes_down: AtomicBool::new(false),
        }
    }

    pub fn set_publishes_down(&self, down: bool) {
        self.publishes_down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueueProvider for OutageProvider {
    async fn declare(&self, queue: &str) -> AppResult<()> {
        self.inner.declare(queue).await
    }

    async fn publish(&self, queue: &str, body: &str) -> AppResult<()> {
        if self.publishes_down.load(Ordering::SeqCst) {
            return Err(AppError::broker("simulated broker outage"));
        }
        self.inner.publish(queue, body).await
    }

    async fn receive(&self, queue: &str, timeout: Duration) -> AppResult<Option<Delivery>> {
        self.inner.receive(queue, timeout).await
    }

    async fn ack(&self, delivery: &Delivery) -> AppResult<()> {
        self.inner.ack(delivery).await
    }

    async fn nack(&self, delivery: &Delivery) -> AppResult<()> {
        self.inner.nack(delivery).await
    }

    async fn recover(&self, queue: &str) -> AppResult<usize> {
        self.inner.recover(queue).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
