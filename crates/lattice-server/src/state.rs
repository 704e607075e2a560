//! Shared, immutable-after-construction state handed to every handler.

use std::sync::Arc;

use lattice_core::bands::BandsRegistry;
use lattice_core::cache::ResponseCache;
use lattice_core::config::GatewayConfig;
use lattice_core::metrics::{InProcessMetrics, MetricsAggregator};
use lattice_core::pricing::PricingCatalog;
use lattice_core::rate_limiter::RateLimiter;
use lattice_providers::adapter::AdapterRegistry;
use lattice_storage::cloud_forwarder::CloudForwarder;
use lattice_storage::trace::TraceSink;

/// Every singleton collaborator the routing pipeline calls into, wired
/// once at startup and shared behind `Arc` for the lifetime of the
/// process — pricing, bands, and config are never mutated after load.
pub struct AppState {
    pub config: GatewayConfig,
    pub pricing: PricingCatalog,
    pub bands: BandsRegistry,
    pub cache: ResponseCache,
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics: Arc<dyn MetricsAggregator>,
    pub registry: AdapterRegistry,
    pub trace_sink: Arc<dyn TraceSink>,
    pub cloud_forwarder: CloudForwarder,
}

impl AppState {
    pub fn build(config: GatewayConfig) -> anyhow::Result<AppState> {
        let pricing = PricingCatalog::load(&config.pricing_file)?;
        let bands = BandsRegistry::load(&config.bands_config_path)?;

        let cache = if config.cache_disabled {
            ResponseCache::disabled()
        } else {
            ResponseCache::open(config.shared_store_url.as_deref(), &config.cache_prefix)?
        };

        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_enabled,
            config.rate_limit_per_day,
        ));
        let metrics: Arc<dyn MetricsAggregator> = Arc::new(InProcessMetrics::new());
        let registry = lattice_providers::build_registry(&config);

        let trace_sink: Arc<dyn TraceSink> = match &config.trace_db_path {
            Some(path) => Arc::new(lattice_storage::trace::SqliteTraceSink::open(path)?),
            None => Arc::new(lattice_storage::trace::NullTraceSink),
        };

        let cloud_forwarder =
            CloudForwarder::spawn(config.cloud_ingest_url.clone(), config.cloud_ingest_key.clone());

        Ok(AppState {
            config,
            pricing,
            bands,
            cache,
            rate_limiter,
            metrics,
            registry,
            trace_sink,
            cloud_forwarder,
        })
    }
}
