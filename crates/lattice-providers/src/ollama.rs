//! Local Ollama adapter. No authentication; generous timeout since local
//! models can be slow to warm up.

use std::pin::Pin;
use std::time::{Duration, Instant};

use lattice_core::error::ProviderError;
use lattice_core::types::{Provenance, ProviderPlan, ProviderResult};
use log::debug;
use serde_json::json;
use tokio::time::timeout;

use crate::adapter::{PlanParams, ProviderAdapter};
use crate::openai::{classify_status_error, classify_transport_error};

const TIMEOUT: Duration = Duration::from_secs(120);

pub struct OllamaAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaAdapter {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

impl ProviderAdapter for OllamaAdapter {
    fn provider_id(&self) -> &'static str {
        "ollama"
    }

    fn plan(&self, params: &PlanParams, model: &str) -> Result<ProviderPlan, ProviderError> {
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
            let body = json!({
                "model": plan.model,
                "prompt": prompt,
                "system": plan.system_prompt,
                "stream": false,
                "options": {
                    "temperature": plan.temperature,
                    "num_predict": plan.max_tokens,
                },
            });

            let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
            debug!("ollama request to {url} for model {}", plan.model);

            let started = Instant::now();
            let response = timeout(TIMEOUT, self.client.post(&url).json(&body).send())
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

            let content = payload["response"]
                .as_str()
                .ok_or_else(|| ProviderError::Internal {
                    provider: self.provider_id().to_string(),
                    detail: "missing 'response' field in Ollama output".to_string(),
                })?
                .to_string();

            // Ollama reports token counts only when the local server tracks
            // them (`eval_count`/`prompt_eval_count`); absence is common
            // enough with small local models that we estimate instead of
            // failing, marking the estimate in provenance.
            let prompt_tokens = payload["prompt_eval_count"].as_u64();
            let completion_tokens = payload["eval_count"].as_u64();
            let estimated = prompt_tokens.is_none() || completion_tokens.is_none();
            let prompt_tokens = prompt_tokens.unwrap_or_else(|| estimate_tokens(prompt));
            let completion_tokens = completion_tokens.unwrap_or_else(|| estimate_tokens(&content));

            Ok(ProviderResult {
                output_text: content,
                prompt_tokens: prompt_tokens as u32,
                completion_tokens: completion_tokens as u32,
                upstream_latency_ms: started.elapsed().as_millis() as u64,
                upstream_cost_usd: None,
                provenance: Provenance {
                    upstream_model: Some(plan.model.clone()),
                    estimated_tokens: estimated,
                },
            })
        })
    }
}

fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64 / 4).max(1)
}
