//! Shared EDI bridge domain primitives.
//!
//! This crate owns deterministic behavior (execution ids, key classification,
//! storage keys, envelope construction, configuration lookup) and the
//! request/response contracts exchanged with the function runtime. It
//! intentionally excludes AWS SDK, HTTP, and Lambda runtime concerns.

pub mod classifier;
pub mod config;
pub mod contract;
pub mod envelope;
pub mod execution;
pub mod resource_ids;
pub mod storage_keys;

pub use config::ConfigError;
pub use contract::ValidationError;
