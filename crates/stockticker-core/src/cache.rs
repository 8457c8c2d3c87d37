//! Single-flight, end-of-day expiring cache for upstream time series.
//!
//! Reads go straight to the store. Only a miss takes the fetch lock, and the
//! lock is shared by every key of a [`TimeSeriesCache`]: upstream calls happen
//! at most once per trading day per symbol, so serializing them is cheaper
//! than tracking in-flight fetches per key.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::data_source::SourceError;
use crate::trading_day::{end_of_trading_day, resolve_time_zone};
use crate::{CacheStoreError, SeriesKind, Symbol, TimeSeries};

/// Cache key derived from series kind and symbol, e.g. `TIME_SERIES_DAILY-MSFT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(kind: SeriesKind, symbol: &Symbol) -> Self {
        Self(format!("{}-{}", kind.function(), symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialized payload with an absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    payload: Vec<u8>,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(payload: Vec<u8>, expires_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            expires_at,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// An entry is still valid at its expiry instant and gone one tick later.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    map: HashMap<String, CacheEntry>,
}

impl CacheInner {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        self.map
            .get(key)
            .filter(|entry| entry.is_live_at(now))
            .cloned()
    }

    fn put(&mut self, key: String, entry: CacheEntry, now: DateTime<Utc>) {
        self.clear_expired(now);
        self.map.insert(key, entry);
    }

    fn clear_expired(&mut self, now: DateTime<Utc>) {
        self.map.retain(|_, entry| entry.is_live_at(now));
    }
}

/// Thread-safe, clock-driven key-value store backing [`TimeSeriesCache`].
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<RwLock<CacheInner>>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner::default())),
            clock,
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Returns the entry for `key` unless it is absent or past its expiry.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = self.clock.now();
        let store = self.inner.read().await;
        store.get(key.as_str(), now)
    }

    /// Stores `entry` and returns its remaining time to live.
    ///
    /// Entries with less than one whole second left are rejected rather than
    /// stored with a zero lifetime.
    pub async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<Duration, CacheStoreError> {
        let now = self.clock.now();
        let ttl = entry.expires_at - now;
        if ttl.num_seconds() <= 0 {
            return Err(CacheStoreError::AlreadyExpired {
                key: key.to_string(),
                expires_at: entry.expires_at,
            });
        }

        let mut store = self.inner.write().await;
        store.put(key.as_str().to_owned(), entry, now);
        Ok(ttl)
    }

    pub async fn clear_expired(&self) {
        let now = self.clock.now();
        let mut store = self.inner.write().await;
        store.clear_expired(now);
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Where a series returned by [`TimeSeriesCache::get_or_fetch`] came from.
#[derive(Debug)]
pub enum SeriesOrigin {
    Cache,
    Upstream { expires_at: DateTime<Utc> },
    /// Fetched, but not persisted; the next call fetches again.
    UpstreamUnstored(CacheStoreError),
}

/// Series plus its provenance.
#[derive(Debug)]
pub struct CachedSeries {
    pub series: TimeSeries,
    pub origin: SeriesOrigin,
}

impl CachedSeries {
    pub fn is_cache_hit(&self) -> bool {
        matches!(self.origin, SeriesOrigin::Cache)
    }
}

/// Time series cache that lets exactly one caller fetch on a miss while the
/// rest wait and then read what it stored.
#[derive(Clone)]
pub struct TimeSeriesCache {
    store: CacheStore,
    fetch_lock: Arc<Mutex<()>>,
}

impl Default for TimeSeriesCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl TimeSeriesCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: CacheStore::new(clock),
            fetch_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.store.get(key).await
    }

    /// Returns the cached series for `key`, or runs `fetch` to populate it.
    ///
    /// Upstream failures propagate and are never cached. Once the fetch lock is
    /// held the fetch runs on its own task, so a caller that goes away does not
    /// cancel a fetch other callers are waiting on.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        fetch: F,
    ) -> Result<CachedSeries, SourceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TimeSeries, SourceError>> + Send + 'static,
    {
        if let Some(series) = self.cached_series(key).await {
            debug!(key = %key, "time series cache hit");
            return Ok(CachedSeries {
                series,
                origin: SeriesOrigin::Cache,
            });
        }

        let guard = Arc::clone(&self.fetch_lock).lock_owned().await;

        // Whoever held the lock before us may have just stored this key.
        if let Some(series) = self.cached_series(key).await {
            debug!(key = %key, "time series cache populated while waiting");
            return Ok(CachedSeries {
                series,
                origin: SeriesOrigin::Cache,
            });
        }

        let cache = self.clone();
        let key = key.clone();
        let pending = fetch();
        let task = tokio::spawn(async move {
            let _guard = guard;
            let series = pending.await?;
            let origin = match cache.persist(&key, &series).await {
                Ok(expires_at) => SeriesOrigin::Upstream { expires_at },
                Err(error) => {
                    warn!(key = %key, %error, "unable to store time series in cache");
                    SeriesOrigin::UpstreamUnstored(error)
                }
            };
            Ok::<_, SourceError>(CachedSeries { series, origin })
        });

        task.await.map_err(|error| {
            SourceError::internal(format!("time series fetch task failed: {error}"))
        })?
    }

    async fn cached_series(&self, key: &CacheKey) -> Option<TimeSeries> {
        let entry = self.store.get(key).await?;
        match serde_json::from_slice(entry.payload()) {
            Ok(series) => Some(series),
            Err(error) => {
                warn!(key = %key, %error, "discarding undecodable cache entry");
                None
            }
        }
    }

    async fn persist(
        &self,
        key: &CacheKey,
        series: &TimeSeries,
    ) -> Result<DateTime<Utc>, CacheStoreError> {
        let payload = serde_json::to_vec(series).map_err(|source| CacheStoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        let tz = resolve_time_zone(series.time_zone())?;
        let expires_at = end_of_trading_day(self.store.clock().now(), tz)?;
        let ttl = self.store.put(key, CacheEntry::new(payload, expires_at)).await?;

        info!(
            key = %key,
            %expires_at,
            tz = tz.name(),
            ttl_secs = ttl.num_seconds(),
            "saving cache"
        );
        Ok(expires_at)
    }
}
