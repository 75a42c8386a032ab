//! Cache Module
//!
//! Provides an in-process TTL cache with single-flight request de-duplication.

use std::time::Duration;

mod entry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::RequestCache;

// == Public Constants ==
/// TTL applied when neither the caller nor the configuration provides one
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Maximum allowed key length in bytes for keys accepted over HTTP
pub const MAX_KEY_LENGTH: usize = 256;
