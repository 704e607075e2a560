//! Provider Adapters (C5): the `plan`/`execute` capability every upstream
//! implements, plus the process-wide registry that dispatches on a
//! provider id string.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use lattice_core::error::ProviderError;
use lattice_core::types::{ProviderPlan, ProviderResult};

/// Parameters the pipeline hands to an adapter's `plan` step.
pub struct PlanParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

/// A single upstream integration. `plan` is pure; `execute` performs the
/// one upstream call and is the only place network I/O happens.
///
/// Boxed-future so adapters read the same way the rest of this codebase's
/// async trait methods do, without requiring the caller to pin a
/// `dyn Future` by hand.
pub trait ProviderAdapter: Send + Sync {
    fn provider_id(&self) -> &'static str;

    fn plan(&self, params: &PlanParams, model: &str) -> Result<ProviderPlan, ProviderError>;

    fn execute<'a>(
        &'a self,
        plan: &'a ProviderPlan,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderResult, ProviderError>> + Send + 'a>>;
}

/// Process-wide registry mapping provider-id strings to concrete adapters,
/// built once at startup. An unknown provider id is a `configuration`
/// error, never a degraded/no-op adapter.
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> AdapterRegistry {
        AdapterRegistry {
            adapters: HashMap::new(),
        }
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider_id().to_string(), adapter);
    }

    pub fn get(&self, provider_id: &str) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        self.adapters
            .get(&provider_id.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ProviderError::Configuration {
                provider: provider_id.to_string(),
                detail: format!("no adapter registered for provider '{provider_id}'"),
            })
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
