//! OpenAI Chat Completions adapter.

use std::pin::Pin;
use std::time::{Duration, Instant};

use lattice_core::error::ProviderError;
use lattice_core::types::{Provenance, ProviderPlan, ProviderResult};
use log::debug;
use serde_json::json;
use tokio::time::timeout;

use crate::adapter::{PlanParams, ProviderAdapter};

const TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenAiAdapter {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl OpenAiAdapter {
    pub fn new(api_base: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            api_key,
        }
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn provider_id(&self) -> &'static str {
        "openai"
    }

    fn plan(&self, params: &PlanParams, model: &str) -> Result<ProviderPlan, ProviderError> {
        if self.api_key.is_none() {
            return Err(ProviderError::Configuration {
                provider: self.provider_id().to_string(),
                detail: "OPENAI_API_KEY is not set".to_string(),
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
                detail: "OPENAI_API_KEY is not set".to_string(),
            })?;

            let mut messages = Vec::new();
            if let Some(system_prompt) = &plan.system_prompt {
                messages.push(json!({"role": "system", "content": system_prompt}));
            }
            messages.push(json!({"role": "user", "content": prompt}));

            let body = json!({
                "model": plan.model,
                "messages": messages,
                "max_tokens": plan.max_tokens,
                "temperature": plan.temperature,
            });

            let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
            debug!("openai request to {url} for model {}", plan.model);

            let started = Instant::now();
            let response = timeout(
                TIMEOUT,
                self.client
                    .post(&url)
                    .bearer_auth(api_key)
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

            let content = payload["choices"][0]["message"]["content"]
                .as_str()
                .ok_or_else(|| ProviderError::Internal {
                    provider: self.provider_id().to_string(),
                    detail: "missing choices[0].message.content in OpenAI response".to_string(),
                })?
                .to_string();

            let prompt_tokens = payload["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32;
            let completion_tokens = payload["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32;

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

/// Shared between adapters: reqwest transport failures (timeout aside,
/// which each adapter already wraps with its own `tokio::time::timeout`)
/// classify onto the taxonomy the same way everywhere.
pub(crate) fn classify_transport_error(provider: &str, err: reqwest::Error) -> ProviderError {
    let classified: ProviderError = err.into();
    match classified {
        ProviderError::Timeout { .. } => ProviderError::Timeout {
            provider: provider.to_string(),
        },
        ProviderError::RateLimit { .. } => ProviderError::RateLimit {
            provider: provider.to_string(),
        },
        ProviderError::Validation { detail, .. } => ProviderError::Validation {
            provider: provider.to_string(),
            detail,
        },
        other => ProviderError::Internal {
            provider: provider.to_string(),
            detail: other.to_string(),
        },
    }
}

pub(crate) fn classify_status_error(
    provider: &str,
    status: reqwest::StatusCode,
    payload: &serde_json::Value,
) -> ProviderError {
    let detail = payload
        .get("error")
        .map(|e| e.to_string())
        .unwrap_or_else(|| status.to_string());

    if status.as_u16() == 429 {
        ProviderError::RateLimit {
            provider: provider.to_string(),
        }
    } else if status.is_client_error() {
        ProviderError::Validation {
            provider: provider.to_string(),
            detail,
        }
    } else {
        ProviderError::Internal {
            provider: provider.to_string(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_requires_api_key() {
        let adapter = OpenAiAdapter::new("https://api.openai.com/v1".to_string(), None);
        let params = PlanParams {
            temperature: 0.7,
            max_tokens: 256,
            system_prompt: None,
        };
        let err = adapter.plan(&params, "gpt-4o-mini").unwrap_err();
        assert!(matches!(err, ProviderError::Configuration { .. }));
    }

    #[test]
    fn plan_carries_model_and_params() {
        let adapter = OpenAiAdapter::new(
            "https://api.openai.com/v1".to_string(),
            Some("sk-test".to_string()),
        );
        let params = PlanParams {
            temperature: 0.5,
            max_tokens: 128,
            system_prompt: Some("be terse".to_string()),
        };
        let plan = adapter.plan(&params, "gpt-4o-mini").unwrap();
        assert_eq!(plan.model, "gpt-4o-mini");
        assert_eq!(plan.max_tokens, 128);
    }

    #[test]
    fn rate_limit_status_classifies_correctly() {
        let err = classify_status_error("openai", reqwest::StatusCode::TOO_MANY_REQUESTS, &json!({}));
        assert!(matches!(err, ProviderError::RateLimit { .. }));
    }

    #[test]
    fn server_error_status_classifies_as_internal() {
        let err = classify_status_error(
            "openai",
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            &json!({}),
        );
        assert!(matches!(err, ProviderError::Internal { .. }));
    }
}
