//! Cached weather lookups for a resolved location

use std::sync::Arc;

use tracing::{info, instrument};

use crate::aggregate::WeatherAggregator;
use crate::cache::{CachePolicy, CacheStats, Cached, SwrCache};
use crate::config::{CacheConfig, GatewayConfig};
use crate::geocode::Geocoder;
use crate::http::FetchClient;
use crate::models::{AggregatedBundle, GeoLocation, ProviderRequestOptions, Units};
use crate::providers::{WeatherProvider, default_providers};
use crate::Result;

/// Entry point used by the binary and by embedders
#[derive(Debug, Clone)]
pub struct WeatherService {
    aggregator: WeatherAggregator,
    geocoder: Geocoder,
    cache: SwrCache<AggregatedBundle>,
    cache_config: CacheConfig,
}

impl WeatherService {
    /// Build the fetch client, adapters, aggregator and cache from configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let client = FetchClient::from_config(&config.http)?;
        let providers = default_providers(&client, &config.providers);
        let geocoder = Geocoder::new(client, &config.providers.geocoding_base);
        Ok(Self::new(providers, geocoder, config.cache.clone()))
    }

    #[must_use]
    pub fn new(
        providers: Vec<Arc<dyn WeatherProvider>>,
        geocoder: Geocoder,
        cache_config: CacheConfig,
    ) -> Self {
        Self {
            aggregator: WeatherAggregator::new(providers),
            geocoder,
            cache: SwrCache::new(cache_config.capacity),
            cache_config,
        }
    }

    #[must_use]
    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Current conditions, cached under the current-weather TTL
    #[instrument(skip(self, location), fields(location = %location.name))]
    pub async fn current_weather(
        &self,
        location: &GeoLocation,
        units: Units,
        lang: &str,
    ) -> Result<Cached<AggregatedBundle>> {
        let options = ProviderRequestOptions::new(units, lang, ProviderRequestOptions::MAX_FORECAST_DAYS);
        let key = current_key(location, &options);
        let policy = CachePolicy::new(self.cache_config.ttl_current(), self.cache_config.swr_window());
        self.cached_aggregate(key, policy, location, options).await
    }

    /// Daily forecast, cached under the forecast TTL
    #[instrument(skip(self, location), fields(location = %location.name))]
    pub async fn forecast(
        &self,
        location: &GeoLocation,
        units: Units,
        lang: &str,
        days: usize,
    ) -> Result<Cached<AggregatedBundle>> {
        let options = ProviderRequestOptions::new(units, lang, days);
        let key = forecast_key(location, &options);
        let policy = CachePolicy::new(self.cache_config.ttl_forecast(), self.cache_config.swr_window());
        self.cached_aggregate(key, policy, location, options).await
    }

    /// Wait for any background refresh of `key` to finish
    pub async fn settle(&self, key: &str) {
        self.cache.settle(key).await;
    }

    async fn cached_aggregate(
        &self,
        key: String,
        policy: CachePolicy,
        location: &GeoLocation,
        options: ProviderRequestOptions,
    ) -> Result<Cached<AggregatedBundle>> {
        let aggregator = self.aggregator.clone();
        let target = location.clone();
        let cached = self
            .cache
            .get_or_set(&key, policy, move || async move {
                aggregator.aggregate(&target, &options).await
            })
            .await?;

        info!(key, cache = %cached.status, "Weather served");
        Ok(cached)
    }
}

#[must_use]
pub fn current_key(location: &GeoLocation, options: &ProviderRequestOptions) -> String {
    format!(
        "current:{}:{}:{}",
        location.cache_key_fragment(),
        options.units,
        options.lang
    )
}

#[must_use]
pub fn forecast_key(location: &GeoLocation, options: &ProviderRequestOptions) -> String {
    format!(
        "forecast:{}:{}:{}:{}",
        location.cache_key_fragment(),
        options.units,
        options.lang,
        options.days
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStatus;
    use crate::config::HttpConfig;
    use crate::models::{ProviderCurrentObservation, ProviderWeather};
    use crate::GatewayError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherProvider for CountingProvider {
        fn source(&self) -> &'static str {
            "counting"
        }

        async fn fetch(
            &self,
            _location: &GeoLocation,
            options: &ProviderRequestOptions,
        ) -> Result<ProviderWeather> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProviderWeather {
                source: "counting".into(),
                current: ProviderCurrentObservation {
                    temp_c: Some(call as f64),
                    condition: Some(options.lang.clone()),
                    ..ProviderCurrentObservation::empty("counting")
                },
                forecast: Vec::new(),
            })
        }
    }

    #[derive(Debug)]
    struct BrokenProvider;

    #[async_trait]
    impl WeatherProvider for BrokenProvider {
        fn source(&self) -> &'static str {
            "broken"
        }

        async fn fetch(&self, _: &GeoLocation, _: &ProviderRequestOptions) -> Result<ProviderWeather> {
            Err(GatewayError::transport("http://broken", "connection refused"))
        }
    }

    fn service(providers: Vec<Arc<dyn WeatherProvider>>) -> WeatherService {
        let client = FetchClient::from_config(&HttpConfig::default()).unwrap();
        WeatherService::new(
            providers,
            Geocoder::new(client, "http://127.0.0.1:9"),
            CacheConfig::default(),
        )
    }

    #[test]
    fn test_cache_keys() {
        let location = GeoLocation::new("Oslo", 59.913_868, 10.752_245);
        let options = ProviderRequestOptions::new(Units::Imperial, "nb", 10);

        assert_eq!(current_key(&location, &options), "current:59.9139:10.7522:imperial:nb");
        assert_eq!(forecast_key(&location, &options), "forecast:59.9139:10.7522:imperial:nb:7");
    }

    #[tokio::test]
    async fn test_current_weather_is_cached() {
        let provider = Arc::new(CountingProvider::default());
        let shared: Arc<dyn WeatherProvider> = provider.clone();
        let service = service(vec![shared]);
        let location = GeoLocation::new("Oslo", 59.91, 10.75);

        let first = service.current_weather(&location, Units::Metric, "en").await.unwrap();
        let second = service.current_weather(&location, Units::Metric, "en").await.unwrap();

        assert_eq!(first.status, CacheStatus::Miss);
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.value.current.temp_c, Some(0.0));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_language_and_days_partition_the_cache() {
        let provider = Arc::new(CountingProvider::default());
        let shared: Arc<dyn WeatherProvider> = provider.clone();
        let service = service(vec![shared]);
        let location = GeoLocation::new("Oslo", 59.91, 10.75);

        service.forecast(&location, Units::Metric, "en", 3).await.unwrap();
        let other_days = service.forecast(&location, Units::Metric, "en", 5).await.unwrap();
        let other_lang = service.forecast(&location, Units::Metric, "de", 3).await.unwrap();

        assert_eq!(other_days.status, CacheStatus::Miss);
        assert_eq!(other_lang.status, CacheStatus::Miss);
        assert_eq!(other_lang.value.current.condition.as_deref(), Some("de"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_total_failure_is_wrapped_and_not_cached() {
        let broken: Arc<dyn WeatherProvider> = Arc::new(BrokenProvider);
        let service = service(vec![broken]);
        let location = GeoLocation::new("Oslo", 59.91, 10.75);

        let err = service
            .current_weather(&location, Units::Metric, "en")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::CacheProducer { .. }));
        assert!(matches!(err.root(), GatewayError::AllProvidersFailed { .. }));
        assert_eq!(service.cache_stats().misses, 1);
    }
}
