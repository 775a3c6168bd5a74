//! MET Norway locationforecast adapter

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::{WeatherProvider, build_url, decode_payload};
use crate::http::FetchClient;
use crate::models::{
    GeoLocation, ProviderCurrentObservation, ProviderForecastDaily, ProviderRequestOptions,
    ProviderWeather,
};
use crate::normalize::ms_to_kph;
use crate::Result;

pub const SOURCE: &str = "met-no";

#[derive(Debug, Clone)]
pub struct MetNoProvider {
    client: FetchClient,
    base_url: String,
}

impl MetNoProvider {
    #[must_use]
    pub fn new(client: FetchClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LocationForecast {
    properties: Option<Properties>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    #[serde(default)]
    timeseries: Vec<TimeseriesEntry>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesEntry {
    time: DateTime<Utc>,
    data: EntryData,
}

#[derive(Debug, Deserialize)]
struct EntryData {
    instant: InstantData,
    next_1_hours: Option<NextHours>,
}

#[derive(Debug, Deserialize)]
struct InstantData {
    #[serde(default)]
    details: InstantDetails,
}

#[derive(Debug, Default, Deserialize)]
struct InstantDetails {
    air_temperature: Option<f64>,
    relative_humidity: Option<f64>,
    /// Metres per second
    wind_speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NextHours {
    summary: Option<Summary>,
}

#[derive(Debug, Deserialize)]
struct Summary {
    symbol_code: Option<String>,
}

/// Describe a MET Norway symbol code; unknown codes are spelled out
#[must_use]
pub fn describe_symbol(symbol: &str) -> String {
    let known = match symbol {
        "clearsky_day" | "clearsky_night" => "Clear sky",
        "fair_day" | "fair_night" => "Fair",
        "partlycloudy_day" | "partlycloudy_night" => "Partly cloudy",
        "cloudy" => "Cloudy",
        "lightrain" => "Light rain",
        "rain" => "Rain",
        "heavyrain" => "Heavy rain",
        "lightsnow" => "Light snow",
        "snow" => "Snow",
        "heavysnow" => "Heavy snow",
        "fog" => "Fog",
        "thunderstorms" => "Thunderstorms",
        other => return other.replace('_', " "),
    };
    known.to_string()
}

#[derive(Debug, Clone, Copy)]
struct DailyRange {
    min: f64,
    max: f64,
}

/// Bucket hourly temperatures by UTC calendar day
fn daily_ranges(timeseries: &[TimeseriesEntry]) -> BTreeMap<NaiveDate, DailyRange> {
    let mut ranges: BTreeMap<NaiveDate, DailyRange> = BTreeMap::new();
    for entry in timeseries {
        let Some(temp) = entry.data.instant.details.air_temperature else {
            continue;
        };
        ranges
            .entry(entry.time.date_naive())
            .and_modify(|range| {
                range.min = range.min.min(temp);
                range.max = range.max.max(temp);
            })
            .or_insert(DailyRange { min: temp, max: temp });
    }
    ranges
}

fn into_provider_weather(
    response: LocationForecast,
    payload: &serde_json::Value,
    options: &ProviderRequestOptions,
) -> ProviderWeather {
    let timeseries = response
        .properties
        .map(|p| p.timeseries)
        .unwrap_or_default();
    let first = timeseries.first();

    let details = first.map(|e| &e.data.instant.details);
    let condition = first
        .and_then(|e| e.data.next_1_hours.as_ref())
        .and_then(|n| n.summary.as_ref())
        .and_then(|s| s.symbol_code.as_deref())
        .filter(|s| !s.is_empty())
        .map(describe_symbol);

    let forecast = daily_ranges(&timeseries)
        .into_iter()
        .take(options.days)
        .map(|(date, range)| ProviderForecastDaily {
            source: SOURCE.to_string(),
            date,
            min_c: Some(range.min),
            max_c: Some(range.max),
            pop: None,
            summary: condition.clone(),
            raw: Some(json!({ "min": range.min, "max": range.max })),
        })
        .collect();

    ProviderWeather {
        source: SOURCE.to_string(),
        current: ProviderCurrentObservation {
            temp_c: details.and_then(|d| d.air_temperature),
            humidity: details.and_then(|d| d.relative_humidity),
            wind_kph: details.and_then(|d| d.wind_speed).map(ms_to_kph),
            condition,
            fetched_at: Some(Utc::now()),
            raw: payload
                .pointer("/properties/timeseries/0")
                .cloned(),
            ..ProviderCurrentObservation::empty(SOURCE)
        },
        forecast,
    }
}

#[async_trait]
impl WeatherProvider for MetNoProvider {
    fn source(&self) -> &'static str {
        SOURCE
    }

    #[instrument(skip(self, location, options), fields(location = %location.name))]
    async fn fetch(
        &self,
        location: &GeoLocation,
        options: &ProviderRequestOptions,
    ) -> Result<ProviderWeather> {
        let url = build_url(
            &self.base_url,
            "/weatherapi/locationforecast/2.0/compact",
            &[
                ("lat", location.latitude.to_string()),
                ("lon", location.longitude.to_string()),
            ],
        )?;

        // MET Norway requires an identifying User-Agent on every call
        let user_agent = self.client.user_agent().to_string();
        let headers = [
            ("User-Agent", user_agent.as_str()),
            ("Accept", "application/json"),
        ];
        let payload: serde_json::Value = self
            .client
            .fetch_json_with(&url, &headers, self.client.defaults())
            .await?;
        let response: LocationForecast = decode_payload(&url, &payload)?;

        let weather = into_provider_weather(response, &payload, options);
        debug!(days = weather.forecast.len(), "MET Norway forecast decoded");
        Ok(weather)
    }
}
