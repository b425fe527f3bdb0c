//! Built-in job handler implementations.

pub mod collect;

pub use collect::CollectJobHandler;
