// =============================================================================
// Central Application State — candle analysis service
// =============================================================================
//
// Shared by every request handler via `Arc<AppState>`.
//
// Thread safety:
//   - Atomic counter for requests served.
//   - parking_lot::RwLock for the runtime config and the error log.
//   - The candle source manages its own interior mutability (cache).
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::market_data::CandleSource;
use crate::runtime_config::RuntimeConfig;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event, surfaced on the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// Market the failing request was for, if any.
    pub market: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

// =============================================================================
// AppState
// =============================================================================

pub struct AppState {
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    /// Where candles come from; normally a `CachedSource<UpbitClient>`.
    pub source: Arc<dyn CandleSource>,

    /// Successful analyses returned since start.
    pub analyses_served: AtomicU64,

    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    pub start_time: Instant,
}

/// Payload of the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub analyses_served: u64,
    pub markets: usize,
    pub recent_errors: Vec<ErrorRecord>,
    pub timestamp: String,
}

impl AppState {
    pub fn new(config: RuntimeConfig, source: Arc<dyn CandleSource>) -> Self {
        Self {
            runtime_config: Arc::new(RwLock::new(config)),
            source,
            analyses_served: AtomicU64::new(0),
            recent_errors: RwLock::new(Vec::new()),
            start_time: Instant::now(),
        }
    }

    /// Count one served analysis and return the new total.
    pub fn record_analysis(&self) -> u64 {
        self.analyses_served.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn push_error(&self, message: String, market: Option<String>) {
        let record = ErrorRecord {
            message,
            market,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }

    /// Drop cached candles. Returns how many series were discarded.
    pub fn clear_cache(&self) -> usize {
        self.source.invalidate()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: self.uptime_secs(),
            analyses_served: self.analyses_served.load(Ordering::Relaxed),
            markets: self.runtime_config.read().markets.len(),
            recent_errors: self.recent_errors.read().clone(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::SourceError;
    use crate::types::{CandleSeries, Interval};
    use async_trait::async_trait;

    struct NoSource;

    #[async_trait]
    impl CandleSource for NoSource {
        async fn fetch(
            &self,
            market: &str,
            interval: Interval,
            _count: usize,
        ) -> Result<CandleSeries, SourceError> {
            Err(SourceError::Empty {
                market: market.to_string(),
                interval,
            })
        }
    }

    fn state() -> AppState {
        AppState::new(RuntimeConfig::default(), Arc::new(NoSource))
    }

    #[test]
    fn record_analysis_counts_up() {
        let s = state();
        assert_eq!(s.record_analysis(), 1);
        assert_eq!(s.record_analysis(), 2);
        assert_eq!(s.health().analyses_served, 2);
    }

    #[test]
    fn error_log_is_capped() {
        let s = state();
        for i in 0..(MAX_RECENT_ERRORS + 5) {
            s.push_error(format!("err {i}"), None);
        }
        let errors = s.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "err 5");
    }

    #[test]
    fn uncached_source_clears_nothing() {
        assert_eq!(state().clear_cache(), 0);
    }

    #[test]
    fn health_reports_market_count() {
        let h = state().health();
        assert_eq!(h.status, "ok");
        assert_eq!(h.markets, 7);
    }
}
