//! Current-conditions models, per provider and merged

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::forecast::{NormalizedForecast, ProviderForecastDaily};

/// Unit system requested from upstreams. Internal values are always metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    /// Lower-case name used in cache keys and query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            other => Err(format!("Unknown units '{other}'. Expected metric or imperial.")),
        }
    }
}

/// Options passed to every provider adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequestOptions {
    pub units: Units,
    pub lang: String,
    /// Forecast length in days, always within `1..=MAX_FORECAST_DAYS`
    pub days: usize,
}

impl ProviderRequestOptions {
    pub const MAX_FORECAST_DAYS: usize = 7;

    #[must_use]
    pub fn new(units: Units, lang: impl Into<String>, days: usize) -> Self {
        Self {
            units,
            lang: lang.into(),
            days: days.clamp(1, Self::MAX_FORECAST_DAYS),
        }
    }
}

impl Default for ProviderRequestOptions {
    fn default() -> Self {
        Self::new(Units::Metric, "en", Self::MAX_FORECAST_DAYS)
    }
}

/// One provider's snapshot of current conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCurrentObservation {
    pub source: String,
    /// Temperature in Celsius
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_c: Option<f64>,
    /// Relative humidity in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Wind speed in km/h
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_kph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(
        rename = "fetchedAtISO",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Untouched upstream fragment, kept for auditing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl ProviderCurrentObservation {
    /// An observation with no values reported yet
    #[must_use]
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            temp_c: None,
            humidity: None,
            wind_kph: None,
            condition: None,
            fetched_at: None,
            warnings: Vec::new(),
            raw: None,
        }
    }
}

/// Everything one adapter produced for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderWeather {
    pub source: String,
    pub current: ProviderCurrentObservation,
    pub forecast: Vec<ProviderForecastDaily>,
}

/// Consensus of all surviving providers' current observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedCurrentWeather {
    pub temp_c: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_kph: Option<f64>,
    pub condition: Option<String>,
    pub source_breakdown: Vec<ProviderCurrentObservation>,
    #[serde(rename = "fetchedAtISO")]
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// The value produced by one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedBundle {
    pub current: NormalizedCurrentWeather,
    pub forecast: NormalizedForecast,
    /// One entry per failed provider
    pub warnings: Vec<String>,
    /// Sources that contributed data
    pub providers: Vec<String>,
}
