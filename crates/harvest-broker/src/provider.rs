//! Queue manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use harvest_core::config::broker::BrokerConfig;
use harvest_core::error::AppError;
use harvest_core::result::AppResult;
use harvest_core::traits::queue::{Delivery, QueueProvider};

/// Queue manager that wraps the configured queue provider.
///
/// The provider is selected at construction time based on configuration.
/// Each pipeline component owns its own manager; the broker connection is
/// never shared across components.
#[derive(Debug, Clone)]
pub struct QueueManager {
    /// The inner queue provider.
    inner: Arc<dyn QueueProvider>,
}

impl QueueManager {
    /// Create a new queue manager from configuration.
    pub async fn new(config: &BrokerConfig) -> AppResult<Self> {
        let inner: Arc<dyn QueueProvider> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis queue provider");
                let client = crate::redis::RedisClient::connect(config).await?;
                Arc::new(crate::redis::RedisQueueProvider::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory queue provider");
                Arc::new(crate::memory::MemoryQueueProvider::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown broker provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a queue manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn QueueProvider>) -> Self {
        Self { inner: provider }
    }

    /// Connect to the broker and declare the given queues, retrying on a
    /// fixed delay until the whole sequence succeeds.
    ///
    /// There is no retry limit and no backoff growth; a component that
    /// cannot reach the broker keeps trying until it does or the process is
    /// restarted externally.
    pub async fn connect_with_retry(config: &BrokerConfig, queues: &[&str]) -> Self {
        let delay = Duration::from_secs(config.reconnect_delay_seconds);
        loop {
            match Self::connect_and_declare(config, queues).await {
                Ok(manager) => return manager,
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_in_seconds = config.reconnect_delay_seconds,
                        "Broker connection failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn connect_and_declare(config: &BrokerConfig, queues: &[&str]) -> AppResult<Self> {
        let manager = Self::new(config).await?;
        for queue in queues {
            manager.declare(queue).await?;
        }
        Ok(manager)
    }

    /// Get a reference to the inner provider.
    pub fn provider(&self) -> &dyn QueueProvider {
        self.inner.as_ref()
    }
}

#[async_trait]
impl QueueProvider for QueueManager {
    async fn declare(&self, queue: &str) -> AppResult<()> {
        self.inner.declare(queue).await
    }

    async fn publish(&self, queue: &str, body: &str) -> AppResult<()> {
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
