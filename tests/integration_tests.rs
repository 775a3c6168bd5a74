//! Integration tests for the weather gateway

use std::process::Command;

use serde_json::json;
use weather_gateway::config::GatewayConfig;
use weather_gateway::{CacheStatus, GatewayError, LocationQuery, Units, WeatherService};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn open_meteo_payload() -> serde_json::Value {
    json!({
        "current_weather": {"temperature": 10.0, "windspeed": 12.0, "weathercode": 3, "time": "2024-06-01T12:00"},
        "hourly": {"time": ["2024-06-01T12:00"], "relativehumidity_2m": [60.0]},
        "daily": {
            "time": ["2024-06-01", "2024-06-02"],
            "temperature_2m_min": [8.0, 9.0],
            "temperature_2m_max": [16.0, 18.0],
            "precipitation_probability_max": [30.0, 10.0]
        }
    })
}

fn met_no_payload() -> serde_json::Value {
    json!({
        "properties": {
            "timeseries": [
                {
                    "time": "2024-06-01T12:00:00Z",
                    "data": {
                        "instant": {"details": {"air_temperature": 14.0, "relative_humidity": 70.0, "wind_speed": 5.0}},
                        "next_1_hours": {"summary": {"symbol_code": "rain"}}
                    }
                },
                {
                    "time": "2024-06-01T18:00:00Z",
                    "data": {"instant": {"details": {"air_temperature": 6.0}}}
                },
                {
                    "time": "2024-06-02T12:00:00Z",
                    "data": {"instant": {"details": {"air_temperature": 20.0}}}
                }
            ]
        }
    })
}

fn config_for(server: &MockServer) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.providers.open_meteo_base = server.uri();
    config.providers.met_no_base = server.uri();
    config.providers.geocoding_base = server.uri();
    config.http.retry_attempts = 0;
    config.http.retry_min_jitter_ms = 0;
    config.http.retry_max_jitter_ms = 0;
    config
}

async fn mount_geocoder(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"name": "Bergen", "latitude": 60.39, "longitude": 5.32, "country": "Norway"}]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_name_lookup_merges_providers_and_caches() {
    let server = MockServer::start().await;
    mount_geocoder(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(open_meteo_payload()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weatherapi/locationforecast/2.0/compact"))
        .respond_with(ResponseTemplate::new(200).set_body_json(met_no_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let service = WeatherService::from_config(&config_for(&server)).unwrap();
    let location = service
        .geocoder()
        .resolve(LocationQuery::Name("Bergen".into()), "en")
        .await
        .unwrap();

    let first = service
        .forecast(&location, Units::Metric, "en", 2)
        .await
        .unwrap();
    let second = service
        .forecast(&location, Units::Metric, "en", 2)
        .await
        .unwrap();

    assert_eq!(first.status, CacheStatus::Miss);
    assert_eq!(second.status, CacheStatus::Hit);

    let bundle = first.value;
    assert_eq!(bundle.providers, vec!["open-meteo", "met-no"]);
    assert!(bundle.warnings.is_empty());
    assert_eq!(bundle.current.temp_c, Some(12.0));
    assert_eq!(bundle.current.humidity, Some(65.0));
    assert_eq!(bundle.current.wind_kph, Some(15.0));
    assert_eq!(bundle.current.condition.as_deref(), Some("Overcast"));
    assert_eq!(bundle.current.source_breakdown.len(), 2);

    assert_eq!(bundle.forecast.days.len(), 2);
    assert_eq!(bundle.forecast.days[0].min_c, Some(7.0));
    assert_eq!(bundle.forecast.days[0].max_c, Some(15.0));
    assert_eq!(bundle.forecast.days[0].pop, Some(30.0));
    assert_eq!(bundle.forecast.days[1].max_c, Some(19.0));

    assert_eq!(service.cache_stats().hits, 1);
    assert_eq!(service.cache_stats().misses, 1);
}

#[tokio::test]
async fn test_one_provider_down_degrades_to_warning() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weatherapi/locationforecast/2.0/compact"))
        .respond_with(ResponseTemplate::new(200).set_body_json(met_no_payload()))
        .mount(&server)
        .await;

    let service = WeatherService::from_config(&config_for(&server)).unwrap();
    let location = service
        .geocoder()
        .resolve(
            LocationQuery::Coordinates {
                lat: 60.39,
                lon: 5.32,
                name: None,
            },
            "en",
        )
        .await
        .unwrap();

    let cached = service
        .current_weather(&location, Units::Metric, "en")
        .await
        .unwrap();

    assert_eq!(cached.value.providers, vec!["met-no"]);
    assert_eq!(cached.value.warnings.len(), 1);
    assert!(cached.value.warnings[0].contains("open-meteo"));
    assert!(cached.value.current.warnings[0].starts_with("Provider failure:"));
    assert_eq!(cached.value.current.temp_c, Some(14.0));
    assert_eq!(cached.value.current.condition.as_deref(), Some("Rain"));
}

#[tokio::test]
async fn test_every_provider_down_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let service = WeatherService::from_config(&config_for(&server)).unwrap();
    let location = weather_gateway::GeoLocation::new("Nowhere", 0.0, 0.0);

    let err = service
        .current_weather(&location, Units::Metric, "en")
        .await
        .unwrap_err();

    match err.root() {
        GatewayError::AllProvidersFailed { reasons, .. } => assert_eq!(reasons.len(), 2),
        other => panic!("expected AllProvidersFailed, got {other:?}"),
    }
    assert!(err.user_message().contains("Nowhere"));
}

/// The binary prints help without touching the network
#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_weather-gateway"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--forecast"));
    assert!(stdout.contains("--lat"));
}

/// Missing location is rejected before any request is made
#[test]
fn test_cli_without_location_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_weather-gateway"))
        .env("WEATHER_GATEWAY_CONFIG", "/nonexistent/weather-gateway.toml")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("location"));
}
