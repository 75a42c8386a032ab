//! Expiry Sweep Task
//!
//! Reads already purge expired entries lazily; this task reclaims entries
//! that expire and are never read again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::RequestCache;

/// Spawns a background task that periodically purges expired cache entries.
///
/// The task loops forever, sleeping `sweep_interval_secs` between runs.
/// The returned handle should be aborted during shutdown.
///
/// # Example
/// ```ignore
/// let cache: RequestCache<serde_json::Value> = RequestCache::default();
/// let sweep_handle = spawn_sweep_task(cache.clone(), 30);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<T, E>(cache: RequestCache<T, E>, sweep_interval_secs: u64) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    let interval = Duration::from_secs(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            sweep_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_expired();

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
