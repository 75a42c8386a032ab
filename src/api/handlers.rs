//! API Handlers
//!
//! HTTP request handlers for each cache service endpoint.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;
use tracing::debug;

use crate::cache::RequestCache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    requests::validate_key, ClearResponse, DeleteResponse, FetchQuery, GetResponse,
    HealthResponse, SetRequest, SetResponse, StatsResponse,
};
use crate::upstream::UpstreamClient;

/// Application state shared across all handlers.
///
/// The cache handle is internally synchronized, so cloning the state only
/// clones handles to the same store.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Shared request cache of JSON documents
    pub cache: RequestCache<Value>,
    /// Upstream source for read-through fetches, if configured
    pub upstream: Option<UpstreamClient>,
}

impl AppState {
    /// Creates a new AppState with the given cache and no upstream.
    pub fn new(cache: RequestCache<Value>) -> Self {
        Self {
            cache,
            upstream: None,
        }
    }

    /// Attaches an upstream client for read-through fetches.
    pub fn with_upstream(mut self, upstream: UpstreamClient) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = RequestCache::new(config.default_ttl_duration());
        Ok(Self {
            cache,
            upstream: UpstreamClient::from_config(config)?,
        })
    }
}

/// Handler for PUT /cache
///
/// Stores a JSON value in the cache with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl_duration();
    state.cache.set(req.key.clone(), req.value, ttl);

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
///
/// Returns the cached value, or 404 if it is missing or expired.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .cache
        .get(&key)
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /cache/:key
///
/// Drops the entry and any in-flight fetch for the key. Deleting an absent
/// key is not an error.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let removed = state.cache.delete(&key);
    Json(DeleteResponse::new(key, removed))
}

/// Handler for DELETE /cache
///
/// Drops every entry and in-flight fetch.
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.cache.clear();
    debug!("cache cleared, {} entries dropped", removed);
    Json(ClearResponse::new(removed))
}

/// Handler for GET /fetch/*path
///
/// Read-through fetch: serves the cached document for `path`, joins an
/// in-flight upstream request for it, or starts one.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<FetchQuery>,
) -> Result<Json<GetResponse>> {
    if let Some(error_msg) = validate_key(&path) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let upstream = state
        .upstream
        .clone()
        .ok_or_else(|| CacheError::Unavailable("no upstream configured".to_string()))?;

    let resource = path.clone();
    let value = state
        .cache
        .dedupe(
            &path,
            move || async move { upstream.fetch_json(&resource).await },
            query.ttl_duration(),
        )
        .await?;

    Ok(Json(GetResponse::new(path, value)))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
///
/// Returns health status of the service.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
