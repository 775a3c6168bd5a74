//! Upstream weather provider adapters
//!
//! Each adapter turns one upstream API into a [`ProviderWeather`] in metric
//! units. Adapters know nothing about each other or about merging.

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::config::ProvidersConfig;
use crate::http::FetchClient;
use crate::models::{GeoLocation, ProviderRequestOptions, ProviderWeather};
use crate::{GatewayError, Result};

pub mod met_no;
pub mod open_meteo;

pub use met_no::MetNoProvider;
pub use open_meteo::OpenMeteoProvider;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Stable identifier, used in provenance and warnings
    fn source(&self) -> &'static str;

    async fn fetch(
        &self,
        location: &GeoLocation,
        options: &ProviderRequestOptions,
    ) -> Result<ProviderWeather>;
}

/// The default adapter set, in merge priority order
#[must_use]
pub fn default_providers(
    client: &FetchClient,
    config: &ProvidersConfig,
) -> Vec<Arc<dyn WeatherProvider>> {
    vec![
        Arc::new(OpenMeteoProvider::new(client.clone(), &config.open_meteo_base)),
        Arc::new(MetNoProvider::new(client.clone(), &config.met_no_base)),
    ]
}

/// Decode a retained payload into the adapter's typed view
pub(crate) fn decode_payload<T: serde::de::DeserializeOwned>(
    url: &str,
    payload: &serde_json::Value,
) -> Result<T> {
    T::deserialize(payload).map_err(|e| GatewayError::decode(url, e.to_string()))
}

pub(crate) fn build_url(base: &str, path: &str, params: &[(&str, String)]) -> Result<String> {
    let endpoint = format!("{}{}", base.trim_end_matches('/'), path);
    reqwest::Url::parse_with_params(&endpoint, params)
        .map(String::from)
        .map_err(|e| GatewayError::config(format!("Invalid provider URL '{endpoint}': {e}")))
}
