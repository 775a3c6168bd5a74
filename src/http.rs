//! Resilient outbound HTTP client
//!
//! Every call is one or more attempts, each bounded by a deadline. Transport
//! failures and non-2xx statuses are retried after a jittered pause; a body
//! that arrives but cannot be decoded is returned immediately.

use std::time::Duration;

use rand::RngExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::HttpConfig;
use crate::{GatewayError, Result};

/// Per-call timeout and retry settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Deadline for a single attempt, body included
    pub timeout: Duration,
    /// Additional attempts after the first one
    pub retries: u32,
    /// Fixed part of the pause between attempts
    pub retry_delay: Duration,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
}

impl FetchOptions {
    /// Pause before the next attempt: base delay plus uniform jitter
    #[must_use]
    pub fn backoff_delay(&self) -> Duration {
        let min = self.jitter_min.as_millis() as u64;
        let max = (self.jitter_max.as_millis() as u64).max(min);
        let jitter = rand::rng().random_range(min..=max);
        self.retry_delay + Duration::from_millis(jitter)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&HttpConfig::default())
    }
}

impl From<&HttpConfig> for FetchOptions {
    fn from(config: &HttpConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            retries: config.retry_attempts,
            retry_delay: Duration::from_millis(config.retry_min_jitter_ms),
            jitter_min: Duration::from_millis(config.retry_min_jitter_ms),
            jitter_max: Duration::from_millis(config.retry_max_jitter_ms),
        }
    }
}

/// JSON-over-HTTP client shared by all provider adapters
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    defaults: FetchOptions,
    user_agent: String,
}

impl FetchClient {
    /// Create a client with process-wide defaults
    pub fn new(defaults: FetchOptions, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            defaults,
            user_agent: user_agent.to_string(),
        })
    }

    /// Build a client from the `[http]` configuration section
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Self::new(FetchOptions::from(config), &config.user_agent)
    }

    #[must_use]
    pub fn defaults(&self) -> &FetchOptions {
        &self.defaults
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// GET `url` and decode the JSON body using the default options
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.fetch_json_with(url, &[], &self.defaults).await
    }

    /// GET `url` with extra headers and explicit options
    #[instrument(name = "fetch_json", level = "debug", skip(self, headers, options), fields(retries = options.retries))]
    pub async fn fetch_json_with<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        options: &FetchOptions,
    ) -> Result<T> {
        let mut attempt: u32 = 0;
        loop {
            let started = Instant::now();
            match self.attempt(url, headers, options.timeout).await {
                Ok(value) => {
                    debug!(
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Upstream request succeeded"
                    );
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < options.retries => {
                    let delay = options.backoff_delay();
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Upstream request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(attempt, error = %err, "Upstream request failed, giving up");
                    return Err(err);
                }
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<T> {
        let request = async {
            let mut builder = self.client.get(url);
            for (name, value) in headers {
                builder = builder.header(*name, *value);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| GatewayError::transport(url, e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(GatewayError::http(url, status.as_u16()));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| GatewayError::transport(url, e.to_string()))?;

            serde_json::from_slice::<T>(&body).map_err(|e| GatewayError::decode(url, e.to_string()))
        };

        match tokio::time::timeout(timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::transport(
                url,
                format!("request timed out after {}ms", timeout.as_millis()),
            )),
        }
    }
}
