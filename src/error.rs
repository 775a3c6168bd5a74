//! Error types and handling for the weather gateway

use thiserror::Error;

/// Main error type for the weather gateway.
///
/// Errors are `Clone` because a single producer failure in the cache is
/// handed to every caller that was coalesced onto the same in-flight fetch.
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// Network failure or per-attempt deadline exceeded
    #[error("Transport error calling {url}: {message}")]
    ProviderTransport { url: String, message: String },

    /// Upstream answered with a non-2xx status
    #[error("Upstream {url} responded with {status}")]
    ProviderHttp { url: String, status: u16 },

    /// Upstream answered 2xx but the body could not be decoded
    #[error("Malformed response from {url}: {message}")]
    ProviderDecode { url: String, message: String },

    /// Every configured provider failed for the location
    #[error("All weather providers failed for {location}: {}", reasons.join("; "))]
    AllProvidersFailed {
        location: String,
        reasons: Vec<String>,
    },

    /// A cache producer failed while callers were waiting on it
    #[error("Cache producer for '{key}' failed: {source}")]
    CacheProducer {
        key: String,
        #[source]
        source: Box<GatewayError>,
    },

    /// Location lookup returned nothing
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Unexpected internal failures (e.g. a producer task panicked)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    /// Create a new transport error for `url`
    pub fn transport<U: Into<String>, S: Into<String>>(url: U, message: S) -> Self {
        Self::ProviderTransport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new error for a non-2xx upstream status
    pub fn http<U: Into<String>>(url: U, status: u16) -> Self {
        Self::ProviderHttp {
            url: url.into(),
            status,
        }
    }

    /// Create a new error for an undecodable upstream body
    pub fn decode<U: Into<String>, S: Into<String>>(url: U, message: S) -> Self {
        Self::ProviderDecode {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wrap a producer failure for the given cache key
    pub fn cache_producer<K: Into<String>>(key: K, source: GatewayError) -> Self {
        Self::CacheProducer {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Whether the fetch client should try the request again
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderTransport { .. } | Self::ProviderHttp { .. }
        )
    }

    /// The underlying error with any cache wrapping removed
    #[must_use]
    pub fn root(&self) -> &GatewayError {
        match self {
            Self::CacheProducer { source, .. } => source.root(),
            other => other,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.root() {
            Self::ProviderTransport { .. } | Self::ProviderHttp { .. } => {
                "A weather provider could not be reached. Please try again shortly.".to_string()
            }
            Self::ProviderDecode { .. } => {
                "A weather provider returned data we could not understand.".to_string()
            }
            Self::AllProvidersFailed { location, .. } => {
                format!("No weather provider could serve {location} right now.")
            }
            Self::NotFound { message } => message.clone(),
            Self::Config { .. } => {
                "Configuration error. Please check your config file and environment.".to_string()
            }
            Self::CacheProducer { .. } | Self::Internal { .. } => {
                "Unexpected internal error.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(GatewayError::transport("http://x", "timed out").is_retryable());
        assert!(GatewayError::http("http://x", 503).is_retryable());
        assert!(!GatewayError::decode("http://x", "eof").is_retryable());
        assert!(!GatewayError::not_found("nowhere").is_retryable());
    }

    #[test]
    fn test_root_unwraps_cache_producer() {
        let inner = GatewayError::AllProvidersFailed {
            location: "Oslo".into(),
            reasons: vec!["a".into(), "b".into()],
        };
        let wrapped = GatewayError::cache_producer("current:1:2", inner);
        assert!(matches!(
            wrapped.root(),
            GatewayError::AllProvidersFailed { .. }
        ));
        assert!(wrapped.to_string().contains("current:1:2"));
    }

    #[test]
    fn test_all_providers_failed_lists_reasons() {
        let err = GatewayError::AllProvidersFailed {
            location: "Oslo".into(),
            reasons: vec!["open-meteo: 500".into(), "met-no: timeout".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("open-meteo: 500"));
        assert!(msg.contains("met-no: timeout"));
    }

    #[test]
    fn test_user_messages() {
        let err = GatewayError::not_found("Location could not be resolved: Atlantis");
        assert!(err.user_message().contains("Atlantis"));

        let err = GatewayError::config("bad");
        assert!(err.user_message().contains("Configuration error"));
    }
}
