//! Job dispatch pipeline for Harvest.
//!
//! This crate provides:
//! - A tick scheduler that publishes one collection job per interval
//! - A worker that consumes jobs one at a time, retries transient failures,
//!   and quarantines exhausted jobs on the dead-letter queue
//! - A job executor that dispatches jobs to the correct handler
//! - The built-in collect handler that triggers collection runs

pub mod executor;
pub mod jobs;
pub mod scheduler;
pub mod worker;

pub use scheduler::{TickPublisher, TickScheduler};
pub use worker::{DeliveryOutcome, Worker};
