//! Redis queue provider implementation.
//!
//! Queues are Redis lists: `LPUSH` appends to the back of the queue and
//! `BLMOVE` pops the oldest message into a `<queue>:processing` list, where
//! it stays until settled. Acking removes it from the processing list;
//! nacking moves it back onto the queue. Durability is Redis persistence.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Direction};
use tracing::{debug, warn};

use harvest_core::error::{AppError, ErrorKind};
use harvest_core::result::AppResult;
use harvest_core::traits::queue::{Delivery, QueueProvider};

use super::client::RedisClient;

/// Redis-backed queue provider.
#[derive(Debug, Clone)]
pub struct RedisQueueProvider {
    /// Redis client.
    client: RedisClient,
}

impl RedisQueueProvider {
    /// Create a new Redis queue provider.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn queue_key(&self, queue: &str) -> String {
        self.client.prefixed_key(queue)
    }

    fn processing_key(&self, queue: &str) -> String {
        self.client.prefixed_key(&format!("{queue}:processing"))
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Broker, format!("Redis error: {e}"), e)
    }
}

#[async_trait]
impl QueueProvider for RedisQueueProvider {
    async fn declare(&self, queue: &str) -> AppResult<()> {
        // Lists come into existence on first push; declaring only verifies
        // the broker is reachable.
        let mut conn = self.client.conn_mut();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        debug!(queue, "Declared queue");
        Ok(())
    }

    async fn publish(&self, queue: &str, body: &str) -> AppResult<()> {
        let key = self.queue_key(queue);
        let mut conn = self.client.conn_mut();
        let _: () = conn.lpush(&key, body).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn receive(&self, queue: &str, timeout: Duration) -> AppResult<Option<Delivery>> {
        let key = self.queue_key(queue);
        let processing = self.processing_key(queue);
        let mut conn = self.client.conn_mut();

        let body: Option<String> = conn
            .blmove(
                &key,
                &processing,
                Direction::Right,
                Direction::Left,
                timeout.as_secs_f64(),
            )
            .await
            .map_err(Self::map_err)?;

        Ok(body.map(|body| Delivery {
            queue: queue.to_string(),
            // LREM settles by value, so the body doubles as the receipt.
            receipt: body.clone(),
            body,
        }))
    }

    async fn ack(&self, delivery: &Delivery) -> AppResult<()> {
        let processing = self.processing_key(&delivery.queue);
        let mut conn = self.client.conn_mut();

        let removed: i64 = conn
            .lrem(&processing, 1, &delivery.receipt)
            .await
            .map_err(Self::map_err)?;

        if removed == 0 {
            return Err(AppError::broker(format!(
                "Delivery from '{}' is not in flight",
                delivery.queue
            )));
        }
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> AppResult<()> {
        let processing = self.processing_key(&delivery.queue);
        let key = self.queue_key(&delivery.queue);
        let mut conn = self.client.conn_mut();

        let removed: i64 = conn
            .lrem(&processing, 1, &delivery.receipt)
            .await
            .map_err(Self::map_err)?;

        if removed == 0 {
            return Err(AppError::broker(format!(
                "Delivery from '{}' is not in flight",
                delivery.queue
            )));
        }

        let _: () = conn
            .lpush(&key, &delivery.body)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn recover(&self, queue: &str) -> AppResult<usize> {
        let processing = self.processing_key(queue);
        let key = self.queue_key(queue);
        let mut conn = self.client.conn_mut();

        let mut count = 0usize;
        loop {
            let body: Option<String> = conn.rpop(&processing, None).await.map_err(Self::map_err)?;
            match body {
                Some(body) => {
                    let _: () = conn.lpush(&key, &body).await.map_err(Self::map_err)?;
                    count += 1;
                }
                None => break,
            }
        }

        if count > 0 {
            warn!(queue, count, "Requeued in-flight messages from previous run");
        }
        Ok(count)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
