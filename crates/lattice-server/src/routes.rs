//! HTTP Gateway Surface (C13): thin handlers over the routing pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use lattice_core::error::GatewayError;
use lattice_core::types::CompletionRequest;

use crate::pipeline;
use crate::state::AppState;

pub async fn complete(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompletionRequest>,
) -> impl IntoResponse {
    match pipeline::complete(&state, request).await {
        Ok(response) => (axum::http::StatusCode::OK, Json(response)).into_response(),
        Err(err) => {
            log_surfaced_error(&err);
            err.into_response()
        }
    }
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "environment": state.config.environment.as_str(),
    }))
}

pub async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut details: HashMap<&str, bool> = HashMap::new();

    let cache_ready = state.cache.ping();
    details.insert("cache", cache_ready);

    let has_provider_key = state.config.openai_api_key.is_some()
        || state.config.anthropic_api_key.is_some()
        || state.config.gemini_api_key.is_some();
    let keys_ready = !state.config.environment.requires_provider_key() || has_provider_key;
    details.insert("provider_keys", keys_ready);

    if cache_ready && keys_ready {
        (axum::http::StatusCode::OK, Json(json!({"status": "ready"}))).into_response()
    } else {
        (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not_ready", "details": details})),
        )
            .into_response()
    }
}

/// Every surfaced error is logged exactly once at the handler boundary:
/// WARN for client-caused kinds, ERROR for deployment-caused ones.
fn log_surfaced_error(err: &GatewayError) {
    let kind = err.kind();
    let status = err.status_code().as_u16();
    let provider = err.provider().unwrap_or("none");
    match kind {
        "internal_error" | "configuration" => {
            tracing::error!(error_type = kind, status_code = status, provider, "{err}");
        }
        _ => {
            tracing::warn!(error_type = kind, status_code = status, provider, "{err}");
        }
    }
}
