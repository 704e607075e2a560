//! Tower middleware enforcing the Rate Limiter (C7) ahead of the handler.
//!
//! Modeled directly on the bridge-style `RateLimitLayer`/`RateLimitMiddleware`
//! pair used elsewhere in this codebase's surrounding ecosystem for exactly
//! this shape of problem: extract a consumer key, ask a limiter, and either
//! pass the request through or return 429 with `Retry-After`.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use tower::{Layer, Service};

use lattice_core::rate_limiter::RateLimiter;

#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
}

impl RateLimitLayer {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
}

impl<S> Service<Request<Body>> for RateLimitMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limiter = self.limiter.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let consumer_key = consumer_key(&req);
            let outcome = limiter.check_and_increment(&consumer_key);

            if outcome.allowed {
                inner.call(req).await
            } else {
                tracing::warn!(
                    consumer = consumer_key,
                    retry_after_secs = outcome.retry_after_secs,
                    "rate limit exceeded"
                );
                Ok((
                    StatusCode::TOO_MANY_REQUESTS,
                    [("Retry-After", outcome.retry_after_secs.to_string())],
                    Json(serde_json::json!({
                        "error": {
                            "type": "rate_limit",
                            "message": format!(
                                "rate limit exceeded, retry after {}s",
                                outcome.retry_after_secs
                            ),
                        }
                    })),
                )
                    .into_response())
            }
        })
    }
}

/// `Authorization: Bearer <token>` keys the limiter when present; otherwise
/// the caller's address (via `X-Forwarded-For`/`X-Real-IP`) does.
fn consumer_key(req: &Request<Body>) -> String {
    if let Some(auth) = req.headers().get(axum::http::header::AUTHORIZATION) {
        if let Ok(value) = auth.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return format!("bearer:{token}");
            }
        }
    }

    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            req.headers()
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .map(|addr| format!("addr:{addr}"))
        .unwrap_or_else(|| "addr:unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn test_router(limiter: Arc<RateLimiter>) -> Router {
        Router::new()
            .route("/ping", post(|| async { "pong" }))
            .layer(RateLimitLayer::new(limiter))
    }

    #[tokio::test]
    async fn allows_requests_within_limit() {
        let limiter = Arc::new(RateLimiter::new(true, 2));
        let app = test_router(limiter);

        for _ in 0..2 {
            let req = Request::builder()
                .method("POST")
                .uri("/ping")
                .body(Body::empty())
                .unwrap();
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn rejects_requests_exceeding_limit_with_retry_after() {
        let limiter = Arc::new(RateLimiter::new(true, 1));
        let app = test_router(limiter);

        let req = Request::builder()
            .method("POST")
            .uri("/ping")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let req = Request::builder()
            .method("POST")
            .uri("/ping")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().contains_key("retry-after"));
    }

    #[tokio::test]
    async fn different_bearer_tokens_have_independent_buckets() {
        let limiter = Arc::new(RateLimiter::new(true, 1));
        let app = test_router(limiter);

        let req = Request::builder()
            .method("POST")
            .uri("/ping")
            .header("authorization", "Bearer alice")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let req = Request::builder()
            .method("POST")
            .uri("/ping")
            .header("authorization", "Bearer bob")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
