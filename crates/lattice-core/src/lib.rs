//! Core types and stateless/singleton collaborators for the routing
//! gateway: the pricing catalog, bands registry, complexity scorer,
//! sensitivity tagger, response cache, rate limiter, and metrics
//! aggregator. The routing pipeline itself lives in `lattice-server`,
//! which wires these together with the adapters in `lattice-providers`.

pub mod bands;
pub mod cache;
pub mod complexity;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pricing;
pub mod rate_limiter;
pub mod sensitivity;
pub mod types;
