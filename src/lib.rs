//! Request Cache - an in-process TTL cache with single-flight de-duplication
//!
//! Concurrent callers asking for the same missing key share one fetch; the
//! result is cached for a bounded time. Also ships a small HTTP service that
//! exposes the cache and deduplicates read-through fetches to an upstream.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use cache::{CacheStats, RequestCache};
pub use config::Config;
pub use error::CacheError;
pub use tasks::spawn_sweep_task;
