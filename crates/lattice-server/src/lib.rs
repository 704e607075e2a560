pub mod pipeline;
pub mod rate_limit_middleware;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Assembles the `axum::Router` exposing the gateway's four endpoints,
/// layered outer-to-inner: request tracing, CORS, then rate limiting.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors_origins: Vec<_> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(cors_origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION]);

    // Rate limiting applies only to the authoritative completion endpoint,
    // so it is layered onto its own sub-router before merging with the
    // unmetered observability routes — otherwise `Router::layer` would
    // wrap every route already registered at the point of the call.
    let limited = Router::new()
        .route("/v1/complete", post(routes::complete))
        .layer(rate_limit_middleware::RateLimitLayer::new(
            state.rate_limiter.clone(),
        ))
        .with_state(state.clone());

    let open = Router::new()
        .route("/v1/metrics", get(routes::metrics))
        .route("/v1/health", get(routes::health))
        .route("/v1/ready", get(routes::ready))
        .with_state(state);

    limited.merge(open).layer(cors).layer(TraceLayer::new_for_http())
}
