//! Redis-backed queue provider.

pub mod client;
pub mod queue;

pub use client::RedisClient;
pub use queue::RedisQueueProvider;
