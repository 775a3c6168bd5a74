//! Location resolution
//!
//! Turns free-text place names or raw coordinates into [`GeoLocation`]s
//! using the Open-Meteo geocoding API.

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::http::FetchClient;
use crate::models::GeoLocation;
use crate::providers::build_url;
use crate::{GatewayError, Result};

/// Maximum number of candidates returned by [`Geocoder::search`]
pub const SEARCH_LIMIT: usize = 5;

/// What the caller asked for
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    /// Explicit coordinates; never hits the network
    Coordinates {
        lat: f64,
        lon: f64,
        name: Option<String>,
    },
    /// Place name to geocode
    Name(String),
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    timezone: Option<String>,
}

impl From<GeocodingResult> for GeoLocation {
    fn from(result: GeocodingResult) -> Self {
        Self {
            name: result.name,
            latitude: result.latitude,
            longitude: result.longitude,
            country: result.country,
            timezone: result.timezone,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    client: FetchClient,
    base_url: String,
}

impl Geocoder {
    #[must_use]
    pub fn new(client: FetchClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn lookup(&self, query: &str, lang: &str, count: usize) -> Result<Vec<GeoLocation>> {
        let url = build_url(
            &self.base_url,
            "/v1/search",
            &[
                ("name", query.to_string()),
                ("count", count.to_string()),
                ("language", lang.to_string()),
                ("format", "json".to_string()),
            ],
        )?;
        let response: GeocodingResponse = self.client.fetch_json(&url).await?;

        Ok(response
            .results
            .unwrap_or_default()
            .into_iter()
            .map(GeoLocation::from)
            .collect())
    }

    /// Up to five candidate locations for `query`
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, lang: &str) -> Result<Vec<GeoLocation>> {
        let locations = self.lookup(query, lang, SEARCH_LIMIT).await?;
        debug!(found = locations.len(), "Geocoding search finished");
        Ok(locations)
    }

    /// Best match for `query`, or `NotFound`
    #[instrument(skip(self))]
    pub async fn resolve_by_name(&self, query: &str, lang: &str) -> Result<GeoLocation> {
        self.lookup(query, lang, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                GatewayError::not_found(format!("Location could not be resolved: {query}"))
            })
    }

    pub async fn resolve(&self, query: LocationQuery, lang: &str) -> Result<GeoLocation> {
        debug!(?query, "Resolving location");

        let location = match query {
            LocationQuery::Coordinates { lat, lon, name } => {
                let name = name.unwrap_or_else(|| format!("{lat:.3},{lon:.3}"));
                GeoLocation::new(name, lat, lon)
            }
            LocationQuery::Name(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(GatewayError::not_found("Location must be provided"));
                }
                self.resolve_by_name(name, lang).await?
            }
        };

        debug!(location = %location, "Resolved location");
        Ok(location)
    }
}
