//! Weather gateway - multi-provider weather aggregation
//!
//! This library queries several public weather APIs for the same location,
//! merges their answers into a consensus view, and serves repeated lookups
//! from a stale-while-revalidate cache.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod geocode;
pub mod http;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod providers;
pub mod service;

// Re-export core types for public API
pub use aggregate::WeatherAggregator;
pub use cache::{CachePolicy, CacheStats, CacheStatus, Cached, SwrCache};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use geocode::{Geocoder, LocationQuery};
pub use http::{FetchClient, FetchOptions};
pub use models::{AggregatedBundle, GeoLocation, ProviderRequestOptions, Units};
pub use providers::{MetNoProvider, OpenMeteoProvider, WeatherProvider};
pub use service::WeatherService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, GatewayError>;
