//! Metrics Aggregator (C8): thread-safe counters and a consistent snapshot.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::sensitivity::is_sensitive_tag;
use crate::types::MetricsSnapshot;

#[derive(Default)]
struct Counters {
    total_requests: u64,
    total_cost: f64,
    total_input_tokens: u64,
    total_output_tokens: u64,
    latency_sum_ms: f64,
    latency_samples: u64,
    cache_hits: u64,
    cache_misses: u64,
    pii_detected: u64,
    providers: HashMap<String, u64>,
    models: HashMap<String, u64>,
    bands: HashMap<String, u64>,
}

/// In-process, mutex-protected metrics backend. A shared-store,
/// atomic-increment backend with identical behavior could implement the
/// same trait; this deployment only wires up the in-process one, since
/// `SHARED_STORE_URL` only backs the cache here.
pub trait MetricsAggregator: Send + Sync {
    fn record_request(
        &self,
        provider: &str,
        model: &str,
        band: &str,
        latency_ms: u64,
        input_tokens: u32,
        output_tokens: u32,
        total_cost: f64,
        cache_hit: bool,
        tags: &[String],
        count_usage: bool,
    );

    fn snapshot(&self) -> MetricsSnapshot;
}

pub struct InProcessMetrics {
    counters: Mutex<Counters>,
}

impl InProcessMetrics {
    pub fn new() -> InProcessMetrics {
        InProcessMetrics {
            counters: Mutex::new(Counters::default()),
        }
    }
}

impl Default for InProcessMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn bump(bucket: &mut HashMap<String, u64>, key: &str) {
    if key.is_empty() {
        return;
    }
    *bucket.entry(key.to_string()).or_insert(0) += 1;
}

impl MetricsAggregator for InProcessMetrics {
    fn record_request(
        &self,
        provider: &str,
        model: &str,
        band: &str,
        latency_ms: u64,
        input_tokens: u32,
        output_tokens: u32,
        total_cost: f64,
        cache_hit: bool,
        tags: &[String],
        count_usage: bool,
    ) {
        let mut c = self.counters.lock().expect("metrics mutex poisoned");
        c.total_requests += 1;
        c.latency_sum_ms += latency_ms as f64;
        c.latency_samples += 1;

        if cache_hit {
            c.cache_hits += 1;
        } else {
            c.cache_misses += 1;
        }

        bump(&mut c.providers, provider);
        bump(&mut c.models, model);
        bump(&mut c.bands, band);

        if count_usage {
            c.total_input_tokens += input_tokens as u64;
            c.total_output_tokens += output_tokens as u64;
            c.total_cost += total_cost;
        }

        if tags.iter().any(|t| is_sensitive_tag(t)) {
            c.pii_detected += 1;
        }
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let c = self.counters.lock().expect("metrics mutex poisoned");
        let average_latency_ms = if c.latency_samples > 0 {
            c.latency_sum_ms / c.latency_samples as f64
        } else {
            0.0
        };
        MetricsSnapshot {
            total_requests: c.total_requests,
            total_cost: (c.total_cost * 1e8).round() / 1e8,
            total_input_tokens: c.total_input_tokens,
            total_output_tokens: c.total_output_tokens,
            average_latency_ms: (average_latency_ms * 1e4).round() / 1e4,
            cache_hits_total: c.cache_hits,
            cache_misses_total: c.cache_misses,
            pii_detected_total: c.pii_detected,
            providers: c.providers.clone(),
            models: c.models.clone(),
            bands: c.bands.clone(),
        }
    }
}
