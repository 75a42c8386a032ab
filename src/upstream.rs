//! Upstream Client
//!
//! Fetches JSON documents from the remote data source that read-through
//! requests are deduplicated against.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{CacheError, Result};

// == Upstream Client ==
/// HTTP client bound to one upstream base URL.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    /// Creates a client for `base_url` with the given request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client from configuration, or `None` when no upstream is set.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        config
            .upstream_url
            .as_deref()
            .map(|url| Self::new(url, Duration::from_secs(config.upstream_timeout)))
            .transpose()
    }

    /// Full URL for a resource path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // == Fetch ==
    /// GETs `path` from the upstream and decodes the body as JSON.
    ///
    /// Transport errors, non-success statuses and undecodable bodies all
    /// map to `CacheError::Upstream`.
    pub async fn fetch_json(&self, path: &str) -> Result<Value> {
        let url = self.url_for(path);
        debug!("fetching upstream {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CacheError::Upstream(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::Upstream(format!(
                "{} responded with status {}",
                url, status
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CacheError::Upstream(format!("invalid JSON from {}: {}", url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_cleanly() {
        let client = UpstreamClient::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();

        assert_eq!(client.url_for("stats"), "http://localhost:8080/stats");
        assert_eq!(
            client.url_for("/listings/42"),
            "http://localhost:8080/listings/42"
        );
    }

    #[test]
    fn test_from_config_without_upstream() {
        let config = Config::default();
        assert!(UpstreamClient::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_from_config_with_upstream() {
        let config = Config {
            upstream_url: Some("http://example.test".to_string()),
            ..Config::default()
        };
        let client = UpstreamClient::from_config(&config).unwrap().unwrap();
        assert_eq!(client.url_for("a"), "http://example.test/a");
    }

    #[tokio::test]
    async fn test_fetch_unreachable_upstream_is_upstream_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let client = UpstreamClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();

        let result = client.fetch_json("anything").await;
        assert!(matches!(result, Err(CacheError::Upstream(_))));
    }
}
