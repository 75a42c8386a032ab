//! Cache Store Module
//!
//! Main cache engine: a TTL map of values plus a map of in-flight fetches,
//! so concurrent callers asking for the same missing key share one fetch.

use std::collections::HashMap;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats, DEFAULT_TTL};
use crate::error::CacheError;

type SharedFetch<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

// == Pending Request ==
/// An in-flight fetch registered under a key.
///
/// `id` tells a settling fetch whether the slot is still its own or was
/// removed (or replaced) by `delete`/`clear` in the meantime.
struct PendingRequest<T, E> {
    id: u64,
    fetch: SharedFetch<T, E>,
}

struct Inner<T, E> {
    entries: HashMap<String, CacheEntry<T>>,
    pending: HashMap<String, PendingRequest<T, E>>,
    stats: CacheStats,
    next_id: u64,
}

impl<T: Clone, E> Inner<T, E> {
    /// Returns a clone of the valid entry for `key`, purging it if expired.
    fn lookup(&mut self, key: &str) -> Option<T> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                let data = entry.data.clone();
                self.stats.record_hit();
                Some(data)
            }
            Some(_) => {
                self.entries.remove(key);
                self.stats.record_expirations(1);
                self.stats.record_miss();
                debug!("cache entry '{}' expired on read", key);
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Removes the pending slot for `key` if it still belongs to fetch `id`.
    fn release(&mut self, key: &str, id: u64) -> bool {
        let owns_slot = self.pending.get(key).is_some_and(|p| p.id == id);
        if owns_slot {
            self.pending.remove(key);
        }
        owns_slot
    }

    fn refresh_sizes(&mut self) {
        let (entries, pending) = (self.entries.len(), self.pending.len());
        self.stats.set_sizes(entries, pending);
    }
}

fn lock<T, E>(inner: &Mutex<Inner<T, E>>) -> MutexGuard<'_, Inner<T, E>> {
    // No invariant spans a panic point inside the lock, so poison is ignored.
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

// == Request Cache ==
/// TTL cache with single-flight de-duplication of concurrent fetches.
///
/// Cloning the handle is cheap; every clone shares the same store. All
/// check-then-register steps run under one mutex, and the mutex is never
/// held across an `.await`. `dedupe` spawns fetches onto the current tokio
/// runtime, so it must be called from within one.
pub struct RequestCache<T, E = CacheError> {
    inner: Arc<Mutex<Inner<T, E>>>,
    default_ttl: Duration,
}

impl<T, E> Clone for RequestCache<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            default_ttl: self.default_ttl,
        }
    }
}

impl<T, E> std::fmt::Debug for RequestCache<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("RequestCache")
            .field("entries", &inner.entries.len())
            .field("pending", &inner.pending.len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl<T: Clone, E> Default for RequestCache<T, E> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<T: Clone, E> RequestCache<T, E> {
    // == Constructor ==
    /// Creates an empty cache using `default_ttl` when callers pass no TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                pending: HashMap::new(),
                stats: CacheStats::new(),
                next_id: 0,
            })),
            default_ttl,
        }
    }

    /// TTL applied by `set` and `dedupe` when none is given.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Get ==
    /// Returns the value for `key` if present and not expired.
    ///
    /// An expired entry is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut inner = lock(&self.inner);
        let value = inner.lookup(key);
        inner.refresh_sizes();
        value
    }

    // == Set ==
    /// Inserts or overwrites `key`, stamped now, valid for `ttl`
    /// (or the default TTL when `None`).
    pub fn set(&self, key: impl Into<String>, value: T, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let mut inner = lock(&self.inner);
        inner.entries.insert(key.into(), CacheEntry::new(value, ttl));
        inner.refresh_sizes();
    }

    // == Delete ==
    /// Removes the entry and any pending fetch registered for `key`.
    ///
    /// Callers already awaiting that fetch still receive its outcome, but a
    /// fetch removed this way never populates the cache. Returns whether
    /// anything was removed.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = lock(&self.inner);
        let had_entry = inner.entries.remove(key).is_some();
        let had_pending = inner.pending.remove(key).is_some();
        inner.refresh_sizes();
        if had_pending {
            debug!("dropped pending fetch for '{}'", key);
        }
        had_entry || had_pending
    }

    // == Clear ==
    /// Empties both the entries and the pending fetches.
    ///
    /// Returns the number of entries dropped.
    pub fn clear(&self) -> usize {
        let mut inner = lock(&self.inner);
        let removed = inner.entries.len();
        inner.entries.clear();
        inner.pending.clear();
        inner.refresh_sizes();
        removed
    }

    // == Purge Expired ==
    /// Removes every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut inner = lock(&self.inner);
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired());
        let removed = before - inner.entries.len();
        inner.stats.record_expirations(removed);
        inner.refresh_sizes();
        removed
    }

    // == Length ==
    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).entries.is_empty()
    }

    /// Number of fetches currently in flight.
    pub fn pending_len(&self) -> usize {
        lock(&self.inner).pending.len()
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut inner = lock(&self.inner);
        inner.refresh_sizes();
        inner.stats.clone()
    }
}

impl<T, E> RequestCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    // == Dedupe ==
    /// Returns the cached value for `key`, or joins the fetch already in
    /// flight for it, or starts `fetcher` and registers it as that fetch.
    ///
    /// Every caller sharing a fetch sees the same `Ok` value or the same
    /// `Err`. On success the value is stored for `ttl` (default TTL when
    /// `None`); on failure nothing is stored and the next call retries.
    pub async fn dedupe<F, Fut>(&self, key: &str, fetcher: F, ttl: Option<Duration>) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let fetch = {
            let mut inner = lock(&self.inner);

            if let Some(value) = inner.lookup(key) {
                return Ok(value);
            }

            let in_flight = inner.pending.get(key).map(|p| p.fetch.clone());
            if let Some(fetch) = in_flight {
                inner.stats.record_coalesced();
                debug!("joined in-flight fetch for '{}'", key);
                fetch
            } else {
                let id = inner.next_id;
                inner.next_id += 1;
                let fetch = spawn_fetch(
                    Arc::downgrade(&self.inner),
                    key.to_string(),
                    id,
                    ttl.unwrap_or(self.default_ttl),
                    fetcher,
                );
                inner.pending.insert(
                    key.to_string(),
                    PendingRequest {
                        id,
                        fetch: fetch.clone(),
                    },
                );
                inner.stats.record_fetch();
                inner.refresh_sizes();
                debug!("started fetch for '{}'", key);
                fetch
            }
        };

        fetch.await
    }
}

/// Spawns `fetcher` as its own task and returns a shareable handle to it.
///
/// The task commits the outcome to the store before any waiter observes
/// it, and runs to completion even if every waiter is dropped. The store is
/// held weakly so an in-flight fetch does not keep a dropped cache alive.
fn spawn_fetch<T, E, F, Fut>(
    store: Weak<Mutex<Inner<T, E>>>,
    key: String,
    id: u64,
    ttl: Duration,
    fetcher: F,
) -> SharedFetch<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let task = tokio::spawn(async move {
        let outcome = AssertUnwindSafe(async move { fetcher().await })
            .catch_unwind()
            .await;

        let Some(store) = store.upgrade() else {
            return match outcome {
                Ok(result) => result,
                Err(payload) => panic::resume_unwind(payload),
            };
        };

        let mut inner = lock(&store);
        let owns_slot = inner.release(&key, id);
        let result = match outcome {
            Ok(Ok(value)) => {
                if owns_slot {
                    inner
                        .entries
                        .insert(key.clone(), CacheEntry::new(value.clone(), ttl));
                    debug!("cached fetch result for '{}'", key);
                } else {
                    debug!("fetch for '{}' was invalidated, result not cached", key);
                }
                Ok(value)
            }
            Ok(Err(err)) => {
                inner.stats.record_fetch_failure();
                warn!("fetch for '{}' failed", key);
                Err(err)
            }
            Err(payload) => {
                inner.stats.record_fetch_failure();
                inner.refresh_sizes();
                drop(inner);
                warn!("fetch for '{}' panicked", key);
                panic::resume_unwind(payload);
            }
        };
        inner.refresh_sizes();
        result
    });

    async move {
        match task.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
            Err(err) => panic!("fetch task did not complete: {}", err),
        }
    }
    .boxed()
    .shared()
}
