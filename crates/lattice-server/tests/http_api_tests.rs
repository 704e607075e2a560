//! End-to-end tests over the assembled router, exercising the scenarios in
//! SPEC_FULL.md §8 against real (in-process) collaborators: a temp-dir sled
//! cache, the `stub` adapter, and an in-memory trace sink. No network I/O.

use std::io::Write;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use lattice_core::bands::BandsRegistry;
use lattice_core::cache::ResponseCache;
use lattice_core::config::{Environment, GatewayConfig};
use lattice_core::metrics::{InProcessMetrics, MetricsAggregator};
use lattice_core::pricing::PricingCatalog;
use lattice_core::rate_limiter::RateLimiter;
use lattice_providers::adapter::AdapterRegistry;
use lattice_providers::stub::StubAdapter;
use lattice_storage::cloud_forwarder::CloudForwarder;
use lattice_storage::trace::{NullTraceSink, TraceSink};
use lattice_server::state::AppState;

fn write_json(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "{contents}").unwrap();
    f
}

fn bands_fixture() -> tempfile::NamedTempFile {
    write_json(
        r#"{
            "default_band": "mid",
            "bands": {
                "low": {"models": [
                    {"provider": "stub", "model": "stub-timeout-1"},
                    {"provider": "stub", "model": "stub-echo-1"}
                ]},
                "mid": {"models": [{"provider": "stub", "model": "stub-echo-1"}]},
                "high": {"models": [{"provider": "stub", "model": "stub-echo-1"}]}
            }
        }"#,
    )
}

fn pricing_fixture() -> tempfile::NamedTempFile {
    write_json(
        r#"{
            "version": "test",
            "providers": {
                "stub": {
                    "stub-echo-1": {"input": 0.0, "output": 0.0, "unit": "per_1k"},
                    "stub-timeout-1": {"input": 0.0, "output": 0.0, "unit": "per_1k"},
                    "stub-internal-1": {"input": 0.0, "output": 0.0, "unit": "per_1k"}
                }
            }
        }"#,
    )
}

struct Fixtures {
    _bands: tempfile::NamedTempFile,
    _pricing: tempfile::NamedTempFile,
    _cache_dir: tempfile::TempDir,
}

fn test_state(rate_limit_enabled: bool, rate_limit_per_day: i64) -> (Arc<AppState>, Fixtures) {
    let bands = bands_fixture();
    let pricing = pricing_fixture();
    let cache_dir = tempfile::tempdir().unwrap();

    let config = GatewayConfig {
        environment: Environment::Dev,
        cors_origins: vec!["http://localhost:3000".to_string()],
        cache_disabled: false,
        cache_prefix: "test".to_string(),
        cache_ttl_seconds: 300,
        rate_limit_enabled,
        rate_limit_per_day,
        openai_api_key: None,
        anthropic_api_key: None,
        gemini_api_key: None,
        openai_api_base: "https://api.openai.com/v1".to_string(),
        ollama_url: "http://localhost:11434".to_string(),
        ollama_model: "qwen2:7b-instruct".to_string(),
        bands_config_path: bands.path().to_str().unwrap().to_string(),
        pricing_file: pricing.path().to_str().unwrap().to_string(),
        shared_store_url: Some(cache_dir.path().to_str().unwrap().to_string()),
        cloud_ingest_url: None,
        cloud_ingest_key: None,
        trace_db_path: None,
    };

    let pricing_catalog = PricingCatalog::load(&config.pricing_file).unwrap();
    let bands_registry = BandsRegistry::load(&config.bands_config_path).unwrap();
    let cache = ResponseCache::open(config.shared_store_url.as_deref(), &config.cache_prefix).unwrap();
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_enabled, config.rate_limit_per_day));
    let metrics: Arc<dyn MetricsAggregator> = Arc::new(InProcessMetrics::new());

    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(StubAdapter));

    let trace_sink: Arc<dyn TraceSink> = Arc::new(NullTraceSink);
    let cloud_forwarder = CloudForwarder::disabled();

    let state = AppState {
        config,
        pricing: pricing_catalog,
        bands: bands_registry,
        cache,
        rate_limiter,
        metrics,
        registry,
        trace_sink,
        cloud_forwarder,
    };

    (
        Arc::new(state),
        Fixtures {
            _bands: bands,
            _pricing: pricing,
            _cache_dir: cache_dir,
        },
    )
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (state, _fixtures) = test_state(false, 0);
    let app = lattice_server::build_router(state);

    let req = Request::builder().uri("/v1/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "dev");
}

#[tokio::test]
async fn ready_endpoint_is_ready_without_provider_keys_in_dev() {
    let (state, _fixtures) = test_state(false, 0);
    let app = lattice_server::build_router(state);

    let req = Request::builder().uri("/v1/ready").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn complete_with_forced_stub_model_echoes_deterministically() {
    let (state, _fixtures) = test_state(false, 0);
    let app = lattice_server::build_router(state);

    let req = Request::builder()
        .method("POST")
        .uri("/v1/complete")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"prompt":"say hi","model":"stub-echo-1"}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["text"], "Hi");
    assert_eq!(body["provider"], "stub");
    assert_eq!(body["model"], "stub-echo-1");
}

#[tokio::test]
async fn complete_rejects_empty_prompt_as_provider_validation() {
    let (state, _fixtures) = test_state(false, 0);
    let app = lattice_server::build_router(state);

    let req = Request::builder()
        .method("POST")
        .uri("/v1/complete")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"prompt":"   "}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "provider_validation");
}

#[tokio::test]
async fn complete_rejects_zero_max_tokens_as_request_validation() {
    let (state, _fixtures) = test_state(false, 0);
    let app = lattice_server::build_router(state);

    let req = Request::builder()
        .method("POST")
        .uri("/v1/complete")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"prompt":"hi","max_tokens":0}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "request_validation");
}

#[tokio::test]
async fn complete_rejects_out_of_range_temperature_as_request_validation() {
    let (state, _fixtures) = test_state(false, 0);
    let app = lattice_server::build_router(state);

    let req = Request::builder()
        .method("POST")
        .uri("/v1/complete")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"prompt":"hi","temperature":50.0}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "request_validation");
}

#[tokio::test]
async fn complete_rejects_unknown_forced_provider_without_trying_any_candidate() {
    let (state, _fixtures) = test_state(false, 0);
    let app = lattice_server::build_router(state);

    let req = Request::builder()
        .method("POST")
        .uri("/v1/complete")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{"prompt":"hello","model":"gpt-9","provider":"not-a-real-provider"}"#,
        ))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "provider_validation");
}

#[tokio::test]
async fn second_identical_request_is_served_from_cache() {
    let (state, _fixtures) = test_state(false, 0);
    let app = lattice_server::build_router(state.clone());

    let make_req = || {
        Request::builder()
            .method("POST")
            .uri("/v1/complete")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"prompt":"explain sorting algorithms","model":"stub-echo-1"}"#))
            .unwrap()
    };

    let first = app.clone().oneshot(make_req()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(make_req()).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);

    let snapshot = state.metrics.snapshot();
    assert_eq!(snapshot.total_requests, 2);
    assert_eq!(snapshot.cache_hits_total, 1);
    assert_eq!(snapshot.cache_misses_total, 1);
}

#[tokio::test]
async fn recoverable_failure_fails_over_to_the_next_band_candidate() {
    let (state, _fixtures) = test_state(false, 0);
    let app = lattice_server::build_router(state);

    // The "low" band fixture lists stub-timeout-1 (recoverable) ahead of
    // stub-echo-1: a successful response proves failover happened.
    let req = Request::builder()
        .method("POST")
        .uri("/v1/complete")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"prompt":"hi","band":"low"}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["model"], "stub-echo-1");
}

#[tokio::test]
async fn prompt_with_email_is_tagged_pii() {
    let (state, _fixtures) = test_state(false, 0);
    let app = lattice_server::build_router(state);

    let req = Request::builder()
        .method("POST")
        .uri("/v1/complete")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{"prompt":"reach me at jane@example.com","model":"stub-echo-1"}"#,
        ))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    let tags: Vec<String> = serde_json::from_value(body["tags"].clone()).unwrap();
    assert!(tags.contains(&"PII_EMAIL".to_string()));
}

#[tokio::test]
async fn rate_limiting_rejects_the_second_request_once_the_daily_quota_is_spent() {
    let (state, _fixtures) = test_state(true, 1);
    let app = lattice_server::build_router(state);

    let make_req = || {
        Request::builder()
            .method("POST")
            .uri("/v1/complete")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"prompt":"hi","model":"stub-echo-1"}"#))
            .unwrap()
    };

    let first = app.clone().oneshot(make_req()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(make_req()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn metrics_endpoint_is_not_rate_limited() {
    let (state, _fixtures) = test_state(true, 1);
    let app = lattice_server::build_router(state);

    for _ in 0..5 {
        let req = Request::builder().uri("/v1/metrics").body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
