use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::source::{CandleSource, SourceError};
use crate::types::{CandleSeries, Interval};

// ---------------------------------------------------------------------------
// Cache key
// ---------------------------------------------------------------------------

/// Identifies one fetched series: the same market and interval requested with
/// a different count is a different entry.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CacheKey {
    pub market: String,
    pub interval: Interval,
    pub count: usize,
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}x{}", self.market, self.interval, self.count)
    }
}

struct CacheEntry {
    fetched_at: Instant,
    series: CandleSeries,
}

// ---------------------------------------------------------------------------
// CachedSource -- TTL cache in front of any CandleSource
// ---------------------------------------------------------------------------

/// Wraps a [`CandleSource`] and serves repeated requests for the same key from
/// memory until the entry is older than `ttl`. Failed fetches are never
/// cached.
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl<S: CandleSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fresh cached series for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<CandleSeries> {
        let map = self.entries.read();
        map.get(key)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.series.clone())
    }

    /// Number of stored entries, fresh or stale.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut map = self.entries.write();
        let removed = map.len();
        map.clear();
        info!(removed, "candle cache cleared");
        removed
    }

    fn store(&self, key: CacheKey, series: CandleSeries) {
        let mut map = self.entries.write();
        // Sweep stale entries.
        let ttl = self.ttl;
        map.retain(|_, e| e.fetched_at.elapsed() < ttl);
        map.insert(
            key,
            CacheEntry {
                fetched_at: Instant::now(),
                series,
            },
        );
    }
}

#[async_trait]
impl<S: CandleSource> CandleSource for CachedSource<S> {
    async fn fetch(
        &self,
        market: &str,
        interval: Interval,
        count: usize,
    ) -> Result<CandleSeries, SourceError> {
        let key = CacheKey {
            market: market.to_string(),
            interval,
            count,
        };

        if let Some(series) = self.get(&key) {
            debug!(key = %key, "candle cache hit");
            return Ok(series);
        }

        debug!(key = %key, "candle cache miss");
        let series = self.inner.fetch(market, interval, count).await?;
        self.store(key, series.clone());
        Ok(series)
    }

    fn invalidate(&self) -> usize {
        self.clear()
    }
}
