use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use weather_gateway::config::LoggingConfig;
use weather_gateway::{
    AggregatedBundle, CacheStatus, GatewayConfig, GeoLocation, LocationQuery, Units,
    WeatherService,
};

/// Query several weather providers for one location and print the consensus
#[derive(Debug, Parser)]
#[command(name = "weather-gateway", version, about)]
struct Cli {
    /// Place name to geocode, e.g. "Oslo"
    location: Option<String>,

    /// Latitude in decimal degrees (requires --lon)
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude in decimal degrees (requires --lat)
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, env = "WEATHER_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// metric or imperial upstream units; output is always metric
    #[arg(long, default_value = "metric")]
    units: Units,

    #[arg(long, default_value = "en")]
    lang: String,

    /// Forecast length in days (1-7)
    #[arg(long, default_value_t = 7)]
    days: usize,

    /// Use the forecast cache instead of current conditions
    #[arg(long)]
    forecast: bool,
}

impl Cli {
    fn location_query(&self) -> Result<LocationQuery> {
        match (self.lat, self.lon, &self.location) {
            (Some(lat), Some(lon), name) => Ok(LocationQuery::Coordinates {
                lat,
                lon,
                name: name.clone(),
            }),
            (_, _, Some(name)) => Ok(LocationQuery::Name(name.clone())),
            _ => bail!("Provide a location name or both --lat and --lon"),
        }
    }
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    location: &'a GeoLocation,
    status: CacheStatus,
    bundle: &'a AggregatedBundle,
}

/// Lead with the user-facing message, keep the detailed error as its cause
fn friendly(error: weather_gateway::GatewayError) -> anyhow::Error {
    let message = error.user_message();
    anyhow::Error::new(error).context(message)
}

fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };

    installed.map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = GatewayConfig::load_from_path(cli.config.clone())
        .with_context(|| "Failed to load configuration")?;
    init_tracing(&config.logging)?;
    debug!(?config, "Configuration loaded");

    let service = WeatherService::from_config(&config)?;

    let query = cli.location_query()?;
    let location = service
        .geocoder()
        .resolve(query, &cli.lang)
        .await
        .map_err(friendly)?;

    let cached = if cli.forecast {
        service
            .forecast(&location, cli.units, &cli.lang, cli.days)
            .await
    } else {
        service.current_weather(&location, cli.units, &cli.lang).await
    }
    .map_err(friendly)?;

    let report = Report {
        location: &location,
        status: cached.status,
        bundle: &cached.value,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to render weather report")?
    );

    Ok(())
}
