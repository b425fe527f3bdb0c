//! # harvest-broker
//!
//! Queue provider implementations for Harvest Dispatch. Supports two modes:
//!
//! - **memory**: In-process queues, used by tests and single-process runs
//! - **redis**: Durable Redis-list queues using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration.

#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::QueueManager;
