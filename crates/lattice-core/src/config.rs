//! Environment-driven configuration, validated once at startup.
//!
//! Mirrors the source's `lattice/config.py` settings object: a flat struct
//! read from env vars, validated eagerly so a misconfigured process never
//! starts serving. There is no live reload; `GatewayConfig` is handed to
//! every collaborator as an immutable `Arc` once wiring completes.

use std::path::Path;

use crate::error::{ConfigError, GatewayError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
    Cloud,
}

impl Environment {
    fn parse(raw: &str) -> Environment {
        match raw.to_ascii_lowercase().as_str() {
            "prod" | "production" => Environment::Prod,
            "cloud" => Environment::Cloud,
            _ => Environment::Dev,
        }
    }

    pub fn requires_provider_key(&self) -> bool {
        matches!(self, Environment::Prod | Environment::Cloud)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
            Environment::Cloud => "cloud",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub cors_origins: Vec<String>,
    pub cache_disabled: bool,
    pub cache_prefix: String,
    pub cache_ttl_seconds: u64,
    pub rate_limit_enabled: bool,
    pub rate_limit_per_day: i64,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub openai_api_base: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub bands_config_path: String,
    pub pricing_file: String,
    pub shared_store_url: Option<String>,
    pub cloud_ingest_url: Option<String>,
    pub cloud_ingest_key: Option<String>,
    pub trace_db_path: Option<String>,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl GatewayConfig {
    /// Reads and validates configuration from the process environment.
    ///
    /// Loads a `.env` file first (if present) for local-development parity
    /// with the source's `pydantic-settings` loader, then reads explicit
    /// environment variables, which always win over `.env` values.
    pub fn from_env() -> Result<GatewayConfig, GatewayError> {
        let _ = dotenvy::dotenv();

        let environment = Environment::parse(&env_var("ENV").unwrap_or_else(|| "dev".into()));

        let cors_origins = env_var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        let cache_ttl_seconds: u64 = env_var("CACHE_TTL_SECONDS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let rate_limit_per_day: i64 = env_var("RATE_LIMIT_PER_DAY")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);

        let config = GatewayConfig {
            environment,
            cors_origins,
            cache_disabled: env_var("CACHE_DISABLED").as_deref() == Some("1"),
            cache_prefix: env_var("CACHE_PREFIX").unwrap_or_else(|| "lattice:cache".to_string()),
            cache_ttl_seconds,
            rate_limit_enabled: env_var("RATE_LIMIT_ENABLED").as_deref() == Some("1"),
            rate_limit_per_day,
            openai_api_key: env_var("OPENAI_API_KEY"),
            anthropic_api_key: env_var("ANTHROPIC_API_KEY"),
            gemini_api_key: env_var("GEMINI_API_KEY"),
            openai_api_base: env_var("OPENAI_API_BASE")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            ollama_url: env_var("OLLAMA_URL")
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            ollama_model: env_var("OLLAMA_MODEL").unwrap_or_else(|| "qwen2:7b-instruct".to_string()),
            bands_config_path: env_var("BANDS_CONFIG_PATH")
                .unwrap_or_else(|| "config/bands.json".to_string()),
            pricing_file: env_var("PRICING_FILE")
                .unwrap_or_else(|| "config/pricing.json".to_string()),
            shared_store_url: env_var("SHARED_STORE_URL"),
            cloud_ingest_url: env_var("CLOUD_INGEST_URL"),
            cloud_ingest_key: env_var("CLOUD_INGEST_KEY"),
            trace_db_path: env_var("TRACE_DB_PATH"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), GatewayError> {
        if self.environment.requires_provider_key()
            && self.openai_api_key.is_none()
            && self.anthropic_api_key.is_none()
            && self.gemini_api_key.is_none()
        {
            return Err(ConfigError {
                message: "at least one provider API key must be configured for prod/cloud environments".into(),
            }
            .into());
        }

        validate_json_file(&self.bands_config_path, "bands configuration")?;
        validate_json_file(&self.pricing_file, "pricing configuration")?;

        if self.rate_limit_per_day < 0 {
            return Err(ConfigError {
                message: "RATE_LIMIT_PER_DAY must be >= 0".into(),
            }
            .into());
        }

        Ok(())
    }
}

fn validate_json_file(path: &str, label: &str) -> Result<(), GatewayError> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(ConfigError {
            message: format!("{label} not found: {}", path.display()),
        }
        .into());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError {
        message: format!("{label} unreadable at {}: {e}", path.display()),
    })?;
    serde_json::from_str::<serde_json::Value>(&contents).map_err(|e| ConfigError {
        message: format!("{label} failed to parse as JSON: {e}"),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_aliases() {
        assert_eq!(Environment::parse("PROD"), Environment::Prod);
        assert_eq!(Environment::parse("cloud"), Environment::Cloud);
        assert_eq!(Environment::parse("anything-else"), Environment::Dev);
    }

    #[test]
    fn missing_bands_file_is_configuration_error() {
        let err = validate_json_file("/nonexistent/bands.json", "bands configuration").unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }
}
