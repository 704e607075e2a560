//! Google Gemini `generateContent` adapter.

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
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl GeminiAdapter {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn provider_id(&self) -> &'static str {
        "gemini"
    }

    fn plan(&self, params: &PlanParams, model: &str) -> Result<ProviderPlan, ProviderError> {
        if self.api_key.is_none() {
            return Err(ProviderError::Configuration {
                provider: self.provider_id().to_string(),
                detail: "GEMINI_API_KEY is not set".to_string(),
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
                detail: "GEMINI_API_KEY is not set".to_string(),
            })?;

            let mut contents = Vec::new();
            if let Some(system_prompt) = &plan.system_prompt {
                contents.push(json!({"role": "user", "parts": [{"text": system_prompt}]}));
            }
            contents.push(json!({"role": "user", "parts": [{"text": prompt}]}));

            let body = json!({
                "contents": contents,
                "generationConfig": {
                    "temperature": plan.temperature,
                    "maxOutputTokens": plan.max_tokens,
                },
            });

            let url = format!(
                "{API_BASE}/models/{}:generateContent?key={}",
                plan.model, api_key
            );
            debug!("gemini request for model {}", plan.model);

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

            let content = payload["candidates"][0]["content"]["parts"][0]["text"]
                .as_str()
                .ok_or_else(|| ProviderError::Internal {
                    provider: self.provider_id().to_string(),
                    detail: "missing candidates[0].content.parts[0].text in Gemini response"
                        .to_string(),
                })?
                .to_string();

            let prompt_tokens = payload["usageMetadata"]["promptTokenCount"]
                .as_u64()
                .unwrap_or(0) as u32;
            let completion_tokens = payload["usageMetadata"]["candidatesTokenCount"]
                .as_u64()
                .unwrap_or(0) as u32;

            Ok(ProviderResult {
                output_text: content,
                prompt_tokens,
                completion_tokens,
                upstream_latency_ms: started.elapsed().as_millis() as u64,
                upstream_cost_usd: None,
                provenance: Provenance {
                    upstream_model: Some(plan.model.clone()),
                    estimated_tokens: false,
                },
            })
        })
    }
}
