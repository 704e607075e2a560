//! Core data model for the routing gateway.
//!
//! These types flow from the HTTP boundary through the routing pipeline and
//! back out again. None of them carry behavior beyond simple constructors;
//! the pipeline in `lattice-server` is what gives them meaning.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A caller-normalized performance/cost tier.
///
/// Only three names are ever exposed to a caller. The scorer and the bands
/// registry may carry richer internal labels (`long_context`, `complex`),
/// but those never escape past [`Band::normalize`].
///
/// # Examples
///
/// ```rust
/// use lattice_core::types::Band;
///
/// assert_eq!(Band::normalize("simple"), Band::Low);
/// assert_eq!(Band::normalize("complex"), Band::High);
/// assert_eq!(Band::normalize("unknown-alias"), Band::Mid);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Low,
    Mid,
    High,
}

impl Band {
    /// Normalizes a band name (including legacy aliases) to one of the
    /// three external bands. Unknown names fall back to `mid`.
    pub fn normalize(name: &str) -> Band {
        match name.to_ascii_lowercase().as_str() {
            "low" | "simple" => Band::Low,
            "mid" | "medium" | "moderate" => Band::Mid,
            "high" | "complex" | "long_context" => Band::High,
            _ => Band::Mid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Low => "low",
            Band::Mid => "mid",
            Band::High => "high",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(provider, model)` pair eligible to serve a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub provider: String,
    pub model: String,
}

/// Inbound request body for `POST /v1/complete`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    #[serde(default)]
    pub band: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Opaque caller metadata. Never logged, never part of the cache key.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.7
}

/// Token usage for a single completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input: u32,
    pub output: u32,
    pub total: u32,
}

impl Usage {
    pub fn new(input: u32, output: u32) -> Self {
        Self {
            input,
            output,
            total: input + output,
        }
    }
}

/// A single provider/model price entry, as loaded from the pricing file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingUnit {
    Per1k,
    PerMillion,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingEntry {
    pub input: f64,
    pub output: f64,
    pub unit: PricingUnit,
}

/// Computed cost for one completion. Costs are rounded to 8 decimals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub currency: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub pricing_version: Option<String>,
}

/// An adapter-specific, frozen request bundle produced by `plan`.
#[derive(Debug, Clone)]
pub struct ProviderPlan {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

/// Adapter-reported metadata carried into the response for auditability.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Provenance {
    pub upstream_model: Option<String>,
    pub estimated_tokens: bool,
}

/// The outcome of one successful adapter `execute` call.
#[derive(Debug, Clone)]
pub struct ProviderResult {
    pub output_text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub upstream_latency_ms: u64,
    pub upstream_cost_usd: Option<f64>,
    pub provenance: Provenance,
}

/// The record of which candidate was chosen, under what rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub reason: String,
    pub candidates: Vec<Candidate>,
    pub chosen: Candidate,
}

/// Outbound response body for `POST /v1/complete`. Also the literal shape
/// persisted in the response cache: no separate wrapper type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub band: Band,
    pub latency_ms: u64,
    pub usage: Usage,
    pub cost: CostBreakdown,
    pub tags: Vec<String>,
    pub routing: RoutingDecision,
}

/// The value stored in the response cache: a full response plus the
/// rationale that produced it, keyed independently of caller metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    pub response_json: serde_json::Value,
    pub cached_at_epoch_secs: u64,
    pub ttl_secs: u64,
}

/// A structured trace of one completed (or failed) request.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRecord {
    pub id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub provider: String,
    pub model: String,
    pub input: String,
    pub output: String,
    pub latency_ms: u64,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost: f64,
    pub band: String,
    pub requested_band: Option<String>,
    pub inferred_band: String,
    pub route_source: String,
    pub plan: String,
    pub provenance: String,
    pub status: TraceStatus,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Success,
    Error,
}

/// Thread-safe aggregated counters, exported verbatim on `GET /v1/metrics`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_cost: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub average_latency_ms: f64,
    pub cache_hits_total: u64,
    pub cache_misses_total: u64,
    pub pii_detected_total: u64,
    pub providers: HashMap<String, u64>,
    pub models: HashMap<String, u64>,
    pub bands: HashMap<String, u64>,
}
