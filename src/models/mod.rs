//! Data models for the weather gateway
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and metadata
//! - Weather: Current conditions per provider and merged
//! - Forecast: Daily forecast entries per provider and merged

pub mod forecast;
pub mod location;
pub mod weather;

// Re-export all public types for convenient access
pub use forecast::{NormalizedForecast, NormalizedForecastDay, ProviderForecastDaily};
pub use location::GeoLocation;
pub use weather::{
    AggregatedBundle, NormalizedCurrentWeather, ProviderCurrentObservation,
    ProviderRequestOptions, ProviderWeather, Units,
};
