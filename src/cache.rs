//! In-memory stale-while-revalidate cache with request coalescing
//!
//! Entries are FRESH until `expires_at`, STALE until `stale_at`, and gone
//! after that. At most one producer runs per key at any time; callers that
//! miss while a producer is running join it instead of starting another.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::{GatewayError, Result};

type InFlight<V> = Shared<BoxFuture<'static, Result<V>>>;

/// How the value handed back by [`SwrCache::get_or_set`] was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    /// Fresh entry, no producer call
    Hit,
    /// Expired entry inside the SWR window; a refresh runs in the background
    Stale,
    /// Produced (or joined) during this call
    Miss,
}

impl CacheStatus {
    /// Upper-case name used in logs and serialized reports
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Stale => "STALE",
            CacheStatus::Miss => "MISS",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Freshness and stale windows for one lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub swr: Duration,
}

impl CachePolicy {
    #[must_use]
    pub fn new(ttl: Duration, swr: Duration) -> Self {
        Self { ttl, swr }
    }

    #[must_use]
    pub fn from_seconds(ttl_seconds: u64, swr_seconds: u64) -> Self {
        Self::new(Duration::from_secs(ttl_seconds), Duration::from_secs(swr_seconds))
    }
}

/// A value together with how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<V> {
    pub value: V,
    pub status: CacheStatus,
}

/// Lookup counters since the cache was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stale: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    stale_at: Instant,
}

enum Lookup<V> {
    Fresh(V),
    Stale(V),
    Expired,
    Missing,
}

struct CacheState<V> {
    store: LruCache<String, CacheEntry<V>>,
    in_flight: HashMap<String, InFlight<V>>,
}

struct CacheInner<V> {
    state: Mutex<CacheState<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
}

impl<V: Clone> CacheInner<V> {
    fn store_value(&self, key: &str, value: V, policy: CachePolicy) {
        let now = Instant::now();
        let expires_at = now + policy.ttl;
        let entry = CacheEntry {
            value,
            expires_at,
            stale_at: expires_at + policy.swr,
        };
        self.state.lock().store.put(key.to_string(), entry);
    }
}

/// Removes the in-flight marker when the producer task ends, panics included
struct InFlightGuard<V> {
    inner: Arc<CacheInner<V>>,
    key: String,
}

impl<V> Drop for InFlightGuard<V> {
    fn drop(&mut self) {
        self.inner.state.lock().in_flight.remove(&self.key);
    }
}

/// Shared handle to a stale-while-revalidate cache
pub struct SwrCache<V> {
    inner: Arc<CacheInner<V>>,
}

impl<V> Clone for SwrCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for SwrCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwrCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<V> SwrCache<V> {
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            stale: self.inner.stale.load(Ordering::Relaxed),
        }
    }

    /// Number of stored entries, stale ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, status: CacheStatus) {
        let counter = match status {
            CacheStatus::Hit => &self.inner.hits,
            CacheStatus::Stale => &self.inner.stale,
            CacheStatus::Miss => &self.inner.misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl<V> SwrCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache holding at most `capacity` entries (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(CacheInner {
                state: Mutex::new(CacheState {
                    store: LruCache::new(capacity),
                    in_flight: HashMap::new(),
                }),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                stale: AtomicU64::new(0),
            }),
        }
    }

    /// Return the cached value for `key`, producing it when absent.
    ///
    /// `producer` only runs when no fresh value exists and no other producer
    /// is already running for the key. Its failure reaches every joined
    /// caller as [`GatewayError::CacheProducer`].
    #[instrument(level = "debug", skip(self, policy, producer))]
    pub async fn get_or_set<F, Fut>(
        &self,
        key: &str,
        policy: CachePolicy,
        producer: F,
    ) -> Result<Cached<V>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let waiter = {
            let mut state = self.inner.state.lock();
            let now = Instant::now();

            let lookup = match state.store.get(key) {
                Some(entry) if now < entry.expires_at => Lookup::Fresh(entry.value.clone()),
                Some(entry) if now < entry.stale_at => Lookup::Stale(entry.value.clone()),
                Some(_) => Lookup::Expired,
                None => Lookup::Missing,
            };
            if let Lookup::Expired = lookup {
                state.store.pop(key);
            }

            match lookup {
                Lookup::Fresh(value) => {
                    self.record(CacheStatus::Hit);
                    debug!("Key found and still fresh");
                    return Ok(Cached {
                        value,
                        status: CacheStatus::Hit,
                    });
                }
                Lookup::Stale(value) => {
                    self.record(CacheStatus::Stale);
                    if state.in_flight.contains_key(key) {
                        debug!("Key stale, refresh already running");
                    } else {
                        debug!("Key stale, starting background refresh");
                        let refresh = self.spawn_producer(key, policy, producer);
                        state.in_flight.insert(key.to_string(), refresh);
                    }
                    return Ok(Cached {
                        value,
                        status: CacheStatus::Stale,
                    });
                }
                Lookup::Expired | Lookup::Missing => {
                    self.record(CacheStatus::Miss);
                    if let Some(running) = state.in_flight.get(key).cloned() {
                        debug!("Key missing, joining running producer");
                        running
                    } else {
                        debug!("Key missing, starting producer");
                        let running = self.spawn_producer(key, policy, producer);
                        state.in_flight.insert(key.to_string(), running.clone());
                        running
                    }
                }
            }
        };

        match waiter.await {
            Ok(value) => Ok(Cached {
                value,
                status: CacheStatus::Miss,
            }),
            Err(err) => Err(GatewayError::cache_producer(key, err)),
        }
    }

    /// Wait for the producer currently running for `key`, if any
    pub async fn settle(&self, key: &str) {
        let running = self.inner.state.lock().in_flight.get(key).cloned();
        if let Some(running) = running {
            let _ = running.await;
        }
    }

    /// Run `producer` on its own task. Must be registered in `in_flight`
    /// under the same lock that observed the key as unclaimed.
    fn spawn_producer<F, Fut>(&self, key: &str, policy: CachePolicy, producer: F) -> InFlight<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let key = key.to_string();

        let handle = tokio::spawn(async move {
            let _guard = InFlightGuard {
                inner: Arc::clone(&inner),
                key: key.clone(),
            };

            let result = producer().await;
            match &result {
                Ok(value) => inner.store_value(&key, value.clone(), policy),
                Err(err) => warn!(key, error = %err, "Cache producer failed"),
            }
            result
        });

        handle
            .map(|joined| match joined {
                Ok(result) => result,
                Err(err) => Err(GatewayError::internal(format!(
                    "cache producer task failed: {err}"
                ))),
            })
            .boxed()
            .shared()
    }
}
