pub mod adapter;
pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod stub;

use std::sync::Arc;

use lattice_core::config::GatewayConfig;

use adapter::AdapterRegistry;
use anthropic::AnthropicAdapter;
use gemini::GeminiAdapter;
use ollama::OllamaAdapter;
use openai::OpenAiAdapter;
use stub::StubAdapter;

/// Builds the process-wide adapter registry from configuration. Every
/// known provider gets an entry regardless of whether its API key is
/// set — a missing key surfaces as a `configuration` error from that
/// adapter's own `plan` step, not as an absent registry entry.
pub fn build_registry(config: &GatewayConfig) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(OpenAiAdapter::new(
        config.openai_api_base.clone(),
        config.openai_api_key.clone(),
    )));
    registry.register(Arc::new(AnthropicAdapter::new(
        config.anthropic_api_key.clone(),
    )));
    registry.register(Arc::new(GeminiAdapter::new(config.gemini_api_key.clone())));
    registry.register(Arc::new(OllamaAdapter::new(config.ollama_url.clone())));
    registry.register(Arc::new(StubAdapter));
    registry
}
