//! Pricing Catalog (C1): per-token cost lookup loaded once from a JSON file.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, GatewayError};
use crate::types::{CostBreakdown, PricingEntry, PricingUnit};

#[derive(Debug, Deserialize)]
struct PricingFile {
    providers: HashMap<String, HashMap<String, PricingEntry>>,
    #[serde(default)]
    version: Option<String>,
}

pub struct PricingCatalog {
    providers: HashMap<String, HashMap<String, PricingEntry>>,
    version: Option<String>,
}

impl PricingCatalog {
    pub fn load(path: &str) -> Result<PricingCatalog, GatewayError> {
        let contents = std::fs::read_to_string(Path::new(path)).map_err(|e| ConfigError {
            message: format!("failed to read pricing file {path}: {e}"),
        })?;
        let file: PricingFile = serde_json::from_str(&contents).map_err(|e| ConfigError {
            message: format!("failed to parse pricing file {path}: {e}"),
        })?;
        Ok(PricingCatalog {
            providers: file.providers,
            version: file.version,
        })
    }

    fn find(&self, provider: &str, model: &str) -> Option<&PricingEntry> {
        self.providers
            .get(provider)
            .and_then(|models| models.get(model))
    }

    /// Computes the cost of one completion. Unknown `(provider, model)`
    /// combinations yield a zeroed breakdown without failing the request.
    pub fn cost(
        &self,
        provider: &str,
        model: &str,
        input_tokens: u32,
        output_tokens: u32,
    ) -> CostBreakdown {
        let (input_cost, output_cost) = match self.find(provider, model) {
            Some(entry) => {
                let divisor = match entry.unit {
                    PricingUnit::Per1k => 1_000.0,
                    PricingUnit::PerMillion => 1_000_000.0,
                };
                let input_rate = entry.input / divisor;
                let output_rate = entry.output / divisor;
                (
                    input_tokens as f64 * input_rate,
                    output_tokens as f64 * output_rate,
                )
            }
            None => (0.0, 0.0),
        };

        let round8 = |v: f64| (v * 1e8).round() / 1e8;
        let input_cost = round8(input_cost);
        let output_cost = round8(output_cost);

        CostBreakdown {
            currency: "usd".to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            input_tokens,
            output_tokens,
            input_cost,
            output_cost,
            total_cost: round8(input_cost + output_cost),
            pricing_version: self.version.clone(),
        }
    }
}
