//! Open-Meteo forecast adapter

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::{WeatherProvider, build_url, decode_payload};
use crate::http::FetchClient;
use crate::models::{
    GeoLocation, ProviderCurrentObservation, ProviderForecastDaily, ProviderRequestOptions,
    ProviderWeather, Units,
};
use crate::normalize::{to_celsius, to_kph};
use crate::Result;

pub const SOURCE: &str = "open-meteo";

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    client: FetchClient,
    base_url: String,
}

impl OpenMeteoProvider {
    #[must_use]
    pub fn new(client: FetchClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn forecast_url(&self, location: &GeoLocation, options: &ProviderRequestOptions) -> Result<String> {
        let (temperature_unit, windspeed_unit) = match options.units {
            Units::Metric => ("celsius", "kmh"),
            Units::Imperial => ("fahrenheit", "mph"),
        };

        build_url(
            &self.base_url,
            "/v1/forecast",
            &[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("current_weather", "true".to_string()),
                ("hourly", "relativehumidity_2m".to_string()),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,precipitation_probability_max".to_string(),
                ),
                ("timezone", "auto".to_string()),
                ("language", options.lang.clone()),
                ("temperature_unit", temperature_unit.to_string()),
                ("windspeed_unit", windspeed_unit.to_string()),
            ],
        )
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeather>,
    hourly: Option<HourlyData>,
    daily: Option<DailyData>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: Option<f64>,
    windspeed: Option<f64>,
    weathercode: Option<u16>,
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HourlyData {
    #[serde(default)]
    time: Vec<String>,
    #[serde(rename = "relativehumidity_2m", default)]
    humidity: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct DailyData {
    #[serde(default)]
    time: Vec<String>,
    #[serde(rename = "temperature_2m_min", default)]
    temperature_min: Vec<Option<f64>>,
    #[serde(rename = "temperature_2m_max", default)]
    temperature_max: Vec<Option<f64>>,
    #[serde(rename = "precipitation_probability_max", default)]
    precipitation_probability: Vec<Option<f64>>,
}

/// Describe a WMO weather interpretation code
#[must_use]
pub fn weather_code_to_description(code: u16) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Freezing drizzle",
        57 => "Heavy freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with hail",
        _ => "Unknown conditions",
    }
}

/// Humidity from the hourly slot matching the observation time, else the first slot
fn closest_humidity(hourly: &HourlyData, target_time: Option<&str>) -> Option<f64> {
    let index = target_time
        .and_then(|target| hourly.time.iter().position(|time| time == target))
        .unwrap_or(0);
    hourly.humidity.get(index).copied().flatten()
}

fn daily_entries(daily: &DailyData, units: Units, summary: Option<&str>) -> Vec<ProviderForecastDaily> {
    daily
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, time)| {
            let Ok(date) = time.parse::<NaiveDate>() else {
                debug!(time, "Skipping daily entry with unparseable date");
                return None;
            };
            let min = daily.temperature_min.get(i).copied().flatten();
            let max = daily.temperature_max.get(i).copied().flatten();
            let pop = daily.precipitation_probability.get(i).copied().flatten();

            Some(ProviderForecastDaily {
                source: SOURCE.to_string(),
                date,
                min_c: min.map(|v| to_celsius(v, units)),
                max_c: max.map(|v| to_celsius(v, units)),
                pop,
                summary: summary.map(str::to_owned),
                raw: Some(json!({
                    "time": time,
                    "temperature_2m_min": min,
                    "temperature_2m_max": max,
                    "precipitation_probability_max": pop,
                })),
            })
        })
        .collect()
}

fn into_provider_weather(
    response: ForecastResponse,
    payload: serde_json::Value,
    options: &ProviderRequestOptions,
) -> ProviderWeather {
    let units = options.units;
    let current = response.current_weather.as_ref();

    let humidity = response
        .hourly
        .as_ref()
        .and_then(|hourly| closest_humidity(hourly, current.and_then(|c| c.time.as_deref())));
    let condition = current
        .and_then(|c| c.weathercode)
        .map(weather_code_to_description);

    let forecast = response
        .daily
        .as_ref()
        .map(|daily| daily_entries(daily, units, condition))
        .unwrap_or_default();

    ProviderWeather {
        source: SOURCE.to_string(),
        current: ProviderCurrentObservation {
            temp_c: current.and_then(|c| c.temperature).map(|v| to_celsius(v, units)),
            humidity,
            wind_kph: current.and_then(|c| c.windspeed).map(|v| to_kph(v, units)),
            condition: condition.map(str::to_owned),
            fetched_at: Some(Utc::now()),
            raw: Some(payload),
            ..ProviderCurrentObservation::empty(SOURCE)
        },
        forecast,
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn source(&self) -> &'static str {
        SOURCE
    }

    #[instrument(skip(self, location, options), fields(location = %location.name, units = %options.units))]
    async fn fetch(
        &self,
        location: &GeoLocation,
        options: &ProviderRequestOptions,
    ) -> Result<ProviderWeather> {
        let url = self.forecast_url(location, options)?;
        let payload: serde_json::Value = self.client.fetch_json(&url).await?;
        let response: ForecastResponse = decode_payload(&url, &payload)?;

        let weather = into_provider_weather(response, payload, options);
        debug!(days = weather.forecast.len(), "Open-Meteo forecast decoded");
        Ok(weather)
    }
}
