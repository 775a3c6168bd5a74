//! Multi-provider fan-out and consensus

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, instrument, warn};

use crate::merge::{merge_current_observations, merge_forecasts};
use crate::models::{AggregatedBundle, GeoLocation, ProviderRequestOptions, ProviderWeather};
use crate::providers::WeatherProvider;
use crate::{GatewayError, Result};

/// Queries every provider concurrently and merges whatever succeeded
#[derive(Debug, Clone)]
pub struct WeatherAggregator {
    providers: Vec<Arc<dyn WeatherProvider>>,
}

impl WeatherAggregator {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn WeatherProvider>>) -> Self {
        Self { providers }
    }

    #[must_use]
    pub fn sources(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.source()).collect()
    }

    /// Fetch from all providers, waiting for every one to settle.
    ///
    /// Fails only when no provider succeeded; individual failures become
    /// warnings on the bundle.
    #[instrument(skip(self, location, options), fields(location = %location.name, days = options.days))]
    pub async fn aggregate(
        &self,
        location: &GeoLocation,
        options: &ProviderRequestOptions,
    ) -> Result<AggregatedBundle> {
        let calls = self.providers.iter().map(|provider| async move {
            let result = provider.fetch(location, options).await;
            (provider.source(), result)
        });
        let settled = join_all(calls).await;

        let mut succeeded: Vec<ProviderWeather> = Vec::new();
        let mut reasons: Vec<String> = Vec::new();
        for (source, result) in settled {
            match result {
                Ok(weather) => succeeded.push(weather),
                Err(err) => {
                    warn!(source, error = %err, "Provider failed");
                    reasons.push(format!("{source}: {err}"));
                }
            }
        }

        if succeeded.is_empty() {
            return Err(GatewayError::AllProvidersFailed {
                location: location.to_string(),
                reasons,
            });
        }

        let warnings: Vec<String> = reasons
            .iter()
            .map(|reason| format!("Provider failure: {reason}"))
            .collect();

        let observations: Vec<_> = succeeded.iter().map(|w| w.current.clone()).collect();
        let forecasts: Vec<_> = succeeded.iter().map(|w| w.forecast.clone()).collect();

        let mut current = merge_current_observations(&observations);
        current.warnings.extend(warnings.iter().cloned());
        let forecast = merge_forecasts(&forecasts, options.days);
        let providers: Vec<String> = succeeded.into_iter().map(|w| w.source).collect();

        info!(
            providers = ?providers,
            failed = warnings.len(),
            forecast_days = forecast.days.len(),
            "Aggregated weather"
        );

        Ok(AggregatedBundle {
            current,
            forecast,
            warnings,
            providers,
        })
    }
}
