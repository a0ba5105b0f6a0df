// =============================================================================
// Candle Source — the engine's only view of where candles come from
// =============================================================================

use async_trait::async_trait;

use crate::types::{CandleSeries, Interval};

/// Failure while obtaining candles from a remote source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("malformed candle payload: {0}")]
    Malformed(String),
    #[error("no candles returned for {market}@{interval}")]
    Empty { market: String, interval: Interval },
}

/// Anything that can turn `(market, interval, count)` into a candle series
/// ordered oldest-first.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch(
        &self,
        market: &str,
        interval: Interval,
        count: usize,
    ) -> Result<CandleSeries, SourceError>;

    /// Drop any locally held candles so the next fetch goes to the origin.
    /// Returns how many cached series were discarded.
    fn invalidate(&self) -> usize {
        0
    }
}
