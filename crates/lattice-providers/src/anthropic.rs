//! Anthropic Messages API adapter.

use std::pin::Pin;
use std::time::{Duration, Instant};

use lattice_core::error::ProviderError;
use lattice_core::types::{Provenance, ProviderPlan, ProviderResult};
use log::debug;
use serde_json::json;
use tokio::time::timeout;

use crate::adapter::{PlanParams, ProviderAdapter};
use crate::openai::{classify_status_error, classify_transport_error};

const TIMEOUT: Duration = Duration::from_secs(60);
const API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl AnthropicAdapter {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn provider_id(&self) -> &'static str {
        "anthropic"
    }

    fn plan(&self, params: &PlanParams, model: &str) -> Result<ProviderPlan, ProviderError> {
        if self.api_key.is_none() {
            return Err(ProviderError::Configuration {
                provider: self.provider_id().to_string(),
                detail: "ANTHROPIC_API_KEY is not set".to_string(),
            });
        }
        Ok(ProviderPlan {
            provider: self.provider_id().to_string(),
            model: model.to_string(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            system_prompt: params.system_prompt.clone(),
        })
    }

    fn execute<'a>(
        &'a self,
        plan: &'a ProviderPlan,
        prompt: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ProviderResult, ProviderError>> + Send + 'a>>
    {
        Box::pin(async move {
            let api_key = self.api_key.as_deref().ok_or_else(|| ProviderError::Configuration {
                provider: self.provider_id().to_string(),
                detail: "ANTHROPIC_API_KEY is not set".to_string(),
            })?;

            let mut body = json!({
                "model": plan.model,
                "max_tokens": plan.max_tokens,
                "temperature": plan.temperature,
                "messages": [{"role": "user", "content": prompt}],
            });
            if let Some(system_prompt) = &plan.system_prompt {
                body["system"] = json!(system_prompt);
            }

            let url = format!("{API_BASE}/messages");
            debug!("anthropic request to {url} for model {}", plan.model);

            let started = Instant::now();
            let response = timeout(
                TIMEOUT,
                self.client
                    .post(&url)
                    .header("x-api-key", api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body)
                    .send(),
            )
            .await
            .map_err(|_| ProviderError::Timeout {
                provider: self.provider_id().to_string(),
            })?
            .map_err(|e| classify_transport_error(self.provider_id(), e))?;

            let status = response.status();
            let payload: serde_json::Value = response
                .json()
                .await
                .map_err(|e| classify_transport_error(self.provider_id(), e))?;

            if !status.is_success() {
                return Err(classify_status_error(self.provider_id(), status, &payload));
            }

            let content = payload["content"][0]["text"]
                .as_str()
                .ok_or_else(|| ProviderError::Internal {
                    provider: self.provider_id().to_string(),
                    detail: "missing content[0].text in Anthropic response".to_string(),
                })?
                .to_string();

            let prompt_tokens = payload["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32;
            let completion_tokens = payload["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32;

            Ok(ProviderResult {
                output_text: content,
                prompt_tokens,
                completion_tokens,
                upstream_latency_ms: started.elapsed().as_millis() as u64,
                upstream_cost_usd: None,
                provenance: Provenance {
                    upstream_model: payload["model"].as_str().map(String::from),
                    estimated_tokens: false,
                },
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_requires_api_key() {
        let adapter = AnthropicAdapter::new(None);
        let params = PlanParams {
            temperature: 0.7,
            max_tokens: 256,
            system_prompt: None,
        };
        let err = adapter.plan(&params, "claude-3-opus-20240229").unwrap_err();
        assert!(matches!(err, ProviderError::Configuration { .. }));
    }
}
