//! API Routes
//!
//! Configures the Axum router with all cache service endpoints.

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, fetch_handler, get_handler, health_handler, set_handler,
    stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache` - Store a JSON value
/// - `DELETE /cache` - Drop every entry and in-flight fetch
/// - `GET /cache/:key` - Retrieve a cached value
/// - `DELETE /cache/:key` - Drop one key
/// - `GET /fetch/*path` - Deduplicated read-through fetch from the upstream
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", put(set_handler).delete(clear_handler))
        .route("/cache/:key", get(get_handler).delete(delete_handler))
        .route("/fetch/*path", get(fetch_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RequestCache;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_route_table() {
        let app = create_router(AppState::new(RequestCache::default()));

        let cases = [
            (Method::GET, "/health", None, StatusCode::OK),
            (Method::GET, "/stats", None, StatusCode::OK),
            (
                Method::PUT,
                "/cache",
                Some(r#"{"key":"k","value":[1,2]}"#),
                StatusCode::OK,
            ),
            (Method::GET, "/cache/k", None, StatusCode::OK),
            (Method::DELETE, "/cache/k", None, StatusCode::OK),
            (Method::GET, "/cache/k", None, StatusCode::NOT_FOUND),
            (Method::DELETE, "/cache", None, StatusCode::OK),
            (
                Method::GET,
                "/fetch/listings/42",
                None,
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (Method::POST, "/cache", None, StatusCode::METHOD_NOT_ALLOWED),
        ];

        for (method, uri, body, expected) in cases {
            let mut request = Request::builder().method(method.clone()).uri(uri);
            if body.is_some() {
                request = request.header("content-type", "application/json");
            }
            let request = request
                .body(body.map(Body::from).unwrap_or_else(Body::empty))
                .unwrap();

            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), expected, "{} {}", method, uri);
        }
    }
}
