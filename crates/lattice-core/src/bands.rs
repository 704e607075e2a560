//! Bands Registry (C2): maps a band name to an ordered candidate list.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, GatewayError};
use crate::types::{Band, Candidate};

#[derive(Debug, Deserialize)]
struct BandEntry {
    #[allow(dead_code)]
    #[serde(default)]
    description: String,
    models: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct BandsFile {
    default_band: String,
    bands: HashMap<String, BandEntry>,
}

pub struct BandsRegistry {
    default_band: String,
    bands: HashMap<String, Vec<Candidate>>,
}

/// A resolved band: its normalized name and ordered candidates.
#[derive(Debug, Clone)]
pub struct ResolvedBand {
    pub band: Band,
    pub models: Vec<Candidate>,
}

impl BandsRegistry {
    pub fn load(path: &str) -> Result<BandsRegistry, GatewayError> {
        let contents = std::fs::read_to_string(Path::new(path)).map_err(|e| ConfigError {
            message: format!("failed to read bands file {path}: {e}"),
        })?;
        let file: BandsFile = serde_json::from_str(&contents).map_err(|e| ConfigError {
            message: format!("failed to parse bands file {path}: {e}"),
        })?;

        let bands = file
            .bands
            .into_iter()
            .map(|(name, entry)| (name, entry.models))
            .collect::<HashMap<_, _>>();

        if !bands.contains_key(&file.default_band) {
            return Err(ConfigError {
                message: format!(
                    "bands file declares default_band '{}' with no matching entry",
                    file.default_band
                ),
            }
            .into());
        }

        Ok(BandsRegistry {
            default_band: file.default_band,
            bands,
        })
    }

    /// Returns the named band's candidates, falling back to the default
    /// band for an unrecognized name. Legacy aliases are normalized first.
    pub fn resolve(&self, band_name: Option<&str>) -> ResolvedBand {
        let band = band_name.map(Band::normalize).unwrap_or(Band::Mid);
        let key = band.as_str();
        let models = self
            .bands
            .get(key)
            .or_else(|| self.bands.get(&self.default_band))
            .cloned()
            .unwrap_or_default();
        ResolvedBand { band, models }
    }

    /// Case-insensitive scan across all bands for the provider serving a
    /// given forced model id.
    pub fn find_provider(&self, model_id: &str) -> Option<String> {
        let target = model_id.to_ascii_lowercase();
        self.bands.values().flatten().find_map(|candidate| {
            if candidate.model.to_ascii_lowercase() == target {
                Some(candidate.provider.clone())
            } else {
                None
            }
        })
    }
}
