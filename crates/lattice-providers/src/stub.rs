//! Deterministic in-process stub adapter: no network calls, used by the
//! gateway's own tests and as a zero-cost, always-available candidate.

use std::pin::Pin;

use lattice_core::error::ProviderError;
use lattice_core::types::{Provenance, ProviderPlan, ProviderResult};

use crate::adapter::{PlanParams, ProviderAdapter};

pub struct StubAdapter;

impl ProviderAdapter for StubAdapter {
    fn provider_id(&self) -> &'static str {
        "stub"
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
            let output_text = match plan.model.as_str() {
                "stub-echo-1" => echo(prompt),
                "stub-timeout-1" => {
                    return Err(ProviderError::Timeout {
                        provider: self.provider_id().to_string(),
                    })
                }
                "stub-internal-1" => {
                    return Err(ProviderError::Internal {
                        provider: self.provider_id().to_string(),
                        detail: "simulated upstream failure".to_string(),
                    })
                }
                _ => echo(prompt),
            };

            Ok(ProviderResult {
                prompt_tokens: count_words(prompt),
                completion_tokens: count_words(&output_text),
                output_text,
                upstream_latency_ms: 5,
                upstream_cost_usd: None,
                provenance: Provenance {
                    upstream_model: Some(plan.model.clone()),
                    estimated_tokens: false,
                },
            })
        })
    }
}

fn echo(prompt: &str) -> String {
    let trimmed = prompt.trim();
    if trimmed.eq_ignore_ascii_case("say hi") {
        "Hi".to_string()
    } else {
        format!("stub response to: {trimmed}")
    }
}

fn count_words(text: &str) -> u32 {
    text.split_whitespace().count().max(1) as u32
}
