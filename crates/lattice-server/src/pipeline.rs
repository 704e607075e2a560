//! Routing Pipeline (C9): the heart of the gateway.
//!
//! Per-request state only; every side effect goes through the collaborators
//! on `AppState`.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use lattice_core::cache::cache_key;
use lattice_core::complexity;
use lattice_core::error::{GatewayError, ProviderError};
use lattice_core::sensitivity;
use lattice_core::types::{
    Band, Candidate, CompletionRequest, CompletionResponse, CostBreakdown, RoutingDecision,
    TraceRecord, TraceStatus, Usage,
};
use lattice_providers::adapter::PlanParams;

use crate::state::AppState;

pub async fn complete(
    state: &AppState,
    request: CompletionRequest,
) -> Result<CompletionResponse, GatewayError> {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(GatewayError::Provider(ProviderError::Validation {
            provider: "none".to_string(),
            detail: "prompt must not be empty".to_string(),
        }));
    }
    if request.max_tokens == 0 {
        return Err(GatewayError::request_validation("max_tokens must be greater than 0"));
    }
    if !(0.0..=2.0).contains(&request.temperature) {
        return Err(GatewayError::request_validation("temperature must be between 0.0 and 2.0"));
    }

    let inferred_band = complexity::band(prompt);
    let band = request
        .band
        .as_deref()
        .map(Band::normalize)
        .unwrap_or(inferred_band);

    let (candidates, routing_reason) = build_candidates(state, &request, band)?;
    let prompt_tags = sensitivity::tags(prompt);

    let mut last_error: Option<ProviderError> = None;

    for candidate in &candidates {
        let key = cache_key(prompt, &candidate.provider, &candidate.model, band.as_str());

        // A cached entry with a sensitivity tag that no longer matches the
        // cached text is still valid: tags are recomputed, never trusted
        // from cache. A corrupt or stale-shaped entry is just a miss.
        if let Some(cached) = state.cache.get(&key) {
            if let Ok(mut response) = serde_json::from_value::<CompletionResponse>(cached.response_json) {
                let cached_tags = sensitivity::tags(&response.text);
                let tags = sensitivity::union(prompt_tags.clone(), cached_tags);
                response.tags = tags.clone();
                response.routing = RoutingDecision {
                    reason: routing_reason.clone(),
                    candidates: candidates.clone(),
                    chosen: candidate.clone(),
                };

                state.metrics.record_request(
                    &response.provider,
                    &response.model,
                    band.as_str(),
                    response.latency_ms,
                    response.usage.input,
                    response.usage.output,
                    response.cost.total_cost,
                    true,
                    &tags,
                    false,
                );
                emit_trace(state, &request, prompt, &response, &routing_reason, TraceStatus::Success, None);

                return Ok(response);
            }
        }

        let adapter = state.registry.get(&candidate.provider)?;
        let params = PlanParams {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            system_prompt: None,
        };
        let plan = match adapter.plan(&params, &candidate.model) {
            Ok(plan) => plan,
            Err(e) => return Err(abort_with_trace(state, &request, prompt, band, &routing_reason, e)),
        };

        let started = Instant::now();
        let result = adapter.execute(&plan, prompt).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(result) => {
                let cost = cost_for(state, candidate, &result);
                let usage = Usage::new(result.prompt_tokens, result.completion_tokens);
                let tags = sensitivity::union(prompt_tags.clone(), Vec::new());

                let response = CompletionResponse {
                    text: result.output_text,
                    provider: candidate.provider.clone(),
                    model: candidate.model.clone(),
                    band,
                    latency_ms,
                    usage,
                    cost: cost.clone(),
                    tags: tags.clone(),
                    routing: RoutingDecision {
                        reason: routing_reason.clone(),
                        candidates: candidates.clone(),
                        chosen: candidate.clone(),
                    },
                };

                store_in_cache(state, &key, &response);

                state.metrics.record_request(
                    &candidate.provider,
                    &candidate.model,
                    band.as_str(),
                    latency_ms,
                    usage.input,
                    usage.output,
                    cost.total_cost,
                    false,
                    &tags,
                    true,
                );

                emit_trace(state, &request, prompt, &response, &routing_reason, TraceStatus::Success, None);
                forward_to_cloud(state, &response);

                return Ok(response);
            }
            Err(provider_error) => {
                if !provider_error.is_recoverable() {
                    return Err(abort_with_trace(state, &request, prompt, band, &routing_reason, provider_error));
                }
                last_error = Some(provider_error);
            }
        }
    }

    let last_error = last_error.unwrap_or_else(|| ProviderError::Internal {
        provider: "none".to_string(),
        detail: "no candidates were available for this band".to_string(),
    });

    Err(abort_with_trace(
        state,
        &request,
        prompt,
        band,
        &routing_reason,
        ProviderError::Internal {
            provider: last_error.provider().to_string(),
            detail: format!("all candidates exhausted; last error: {last_error}"),
        },
    ))
}

/// The adapter's own reported cost wins over a zeroed pricing-table lookup.
fn cost_for(state: &AppState, candidate: &Candidate, result: &lattice_core::types::ProviderResult) -> CostBreakdown {
    let cost = state
        .pricing
        .cost(&candidate.provider, &candidate.model, result.prompt_tokens, result.completion_tokens);

    if cost.total_cost == 0.0 {
        if let Some(upstream_cost) = result.upstream_cost_usd.filter(|c| *c != 0.0) {
            return CostBreakdown {
                total_cost: upstream_cost,
                ..cost
            };
        }
    }
    cost
}

fn build_candidates(
    state: &AppState,
    request: &CompletionRequest,
    band: Band,
) -> Result<(Vec<Candidate>, String), GatewayError> {
    if let Some(model) = &request.model {
        let provider = match &request.provider {
            Some(p) => p.clone(),
            None => state.bands.find_provider(model).ok_or_else(|| {
                GatewayError::Provider(ProviderError::Validation {
                    provider: "unknown".to_string(),
                    detail: format!("no provider registered for model '{model}'"),
                })
            })?,
        };

        if state.registry.get(&provider).is_err() {
            return Err(GatewayError::Provider(ProviderError::Validation {
                provider: provider.clone(),
                detail: format!("provider '{provider}' is not a known adapter"),
            }));
        }

        let candidates = vec![Candidate {
            provider,
            model: model.clone(),
        }];
        Ok((candidates, format!("model override='{model}'")))
    } else {
        let resolved = state.bands.resolve(Some(band.as_str()));
        let source = if request.band.is_some() { "user" } else { "auto" };
        let reason = format!("band='{}' ({source})", resolved.band.as_str());
        Ok((resolved.models, reason))
    }
}

fn store_in_cache(state: &AppState, key: &str, response: &CompletionResponse) {
    let Ok(response_json) = serde_json::to_value(response) else {
        return;
    };

    let cached_at_epoch_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let entry = lattice_core::types::CachedEntry {
        response_json,
        cached_at_epoch_secs,
        ttl_secs: state.config.cache_ttl_seconds,
    };

    if let Err(e) = state.cache.set(key, &entry) {
        log::warn!("failed to write response cache entry: {e}");
    }
}

fn abort_with_trace(
    state: &AppState,
    request: &CompletionRequest,
    prompt: &str,
    band: Band,
    routing_reason: &str,
    err: ProviderError,
) -> GatewayError {
    let provider = err.provider().to_string();
    let error_message = err.to_string();
    let record = TraceRecord {
        id: uuid::Uuid::new_v4().to_string(),
        created_at: chrono::Utc::now(),
        provider: provider.clone(),
        model: request.model.clone().unwrap_or_default(),
        input: prompt.to_string(),
        output: String::new(),
        latency_ms: 0,
        prompt_tokens: 0,
        completion_tokens: 0,
        cost: 0.0,
        band: band.as_str().to_string(),
        requested_band: request.band.clone(),
        inferred_band: complexity::internal_label(prompt).to_string(),
        route_source: routing_reason.to_string(),
        plan: format!("{provider}/{}", request.model.clone().unwrap_or_default()),
        provenance: "aborted".to_string(),
        status: TraceStatus::Error,
        error_message: Some(error_message),
    };
    state.trace_sink.record(&record);
    GatewayError::Provider(err)
}

fn emit_trace(
    state: &AppState,
    request: &CompletionRequest,
    prompt: &str,
    response: &CompletionResponse,
    routing_reason: &str,
    status: TraceStatus,
    error_message: Option<String>,
) {
    let record = TraceRecord {
        id: uuid::Uuid::new_v4().to_string(),
        created_at: chrono::Utc::now(),
        provider: response.provider.clone(),
        model: response.model.clone(),
        input: prompt.to_string(),
        output: response.text.clone(),
        latency_ms: response.latency_ms,
        prompt_tokens: response.usage.input,
        completion_tokens: response.usage.output,
        cost: response.cost.total_cost,
        band: response.band.as_str().to_string(),
        requested_band: request.band.clone(),
        inferred_band: complexity::internal_label(prompt).to_string(),
        route_source: routing_reason.to_string(),
        plan: format!("{}/{}", response.provider, response.model),
        provenance: format!("{:?}", response.routing.chosen),
        status,
        error_message,
    };
    state.trace_sink.record(&record);
}

fn forward_to_cloud(state: &AppState, response: &CompletionResponse) {
    let record = serde_json::json!({
        "provider": response.provider,
        "model": response.model,
        "band": response.band.as_str(),
        "latency_ms": response.latency_ms,
        "input_tokens": response.usage.input,
        "output_tokens": response.usage.output,
        "cost": response.cost.total_cost,
        "tags": response.tags,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    state.cloud_forwarder.forward(record);
}
