// =============================================================================
// Upbit REST Client — public candle endpoint
// =============================================================================
//
// Upbit serves at most 200 candles per request, newest first. The client asks
// for `min(count, 200)` and hands back the series ordered oldest-first.
// No authentication is needed for market data.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::market_data::{CandleSource, SourceError};
use crate::types::{Candle, CandleSeries, Interval};

pub const DEFAULT_BASE_URL: &str = "https://api.upbit.com";

/// Largest `count` the candle endpoint accepts.
pub const MAX_CANDLES_PER_REQUEST: usize = 200;

/// Upbit path segment for an interval.
pub fn candle_path(interval: Interval) -> &'static str {
    match interval {
        Interval::Minute1 => "minutes/1",
        Interval::Minute5 => "minutes/5",
        Interval::Minute15 => "minutes/15",
        Interval::Minute30 => "minutes/30",
        Interval::Hour1 => "minutes/60",
        Interval::Hour4 => "minutes/240",
        Interval::Day => "days",
        Interval::Week => "weeks",
        Interval::Month => "months",
    }
}

/// One element of the candle endpoint's JSON array. Fields the engine does
/// not use are ignored.
#[derive(Debug, Deserialize)]
struct UpbitCandle {
    timestamp: i64,
    opening_price: f64,
    high_price: f64,
    low_price: f64,
    trade_price: f64,
    candle_acc_trade_volume: f64,
}

impl From<UpbitCandle> for Candle {
    fn from(c: UpbitCandle) -> Self {
        Candle::new(
            c.timestamp,
            c.opening_price,
            c.high_price,
            c.low_price,
            c.trade_price,
            c.candle_acc_trade_volume,
        )
    }
}

/// Parse a candle endpoint response body into an oldest-first series.
pub fn parse_candles(body: &str) -> Result<CandleSeries, SourceError> {
    let raw: Vec<UpbitCandle> =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;
    Ok(CandleSeries::from_unordered(
        raw.into_iter().map(Candle::from).collect(),
    ))
}

#[derive(Clone)]
pub struct UpbitClient {
    base_url: String,
    client: reqwest::Client,
}

impl UpbitClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "UpbitClient initialised");

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the candle request. `market` and `count` go through the query
    /// encoder, so a market string cannot add or override parameters.
    fn candles_request(
        &self,
        market: &str,
        interval: Interval,
        count: usize,
    ) -> reqwest::Result<reqwest::Request> {
        let count = count.min(MAX_CANDLES_PER_REQUEST).to_string();
        self.client
            .get(format!("{}/v1/candles/{}", self.base_url, candle_path(interval)))
            .query(&[("market", market), ("count", count.as_str())])
            .build()
    }
}

#[async_trait]
impl CandleSource for UpbitClient {
    /// GET /v1/candles/{path}?market=&count=
    #[instrument(skip(self), name = "upbit::fetch_candles")]
    async fn fetch(
        &self,
        market: &str,
        interval: Interval,
        count: usize,
    ) -> Result<CandleSeries, SourceError> {
        if count > MAX_CANDLES_PER_REQUEST {
            warn!(count, max = MAX_CANDLES_PER_REQUEST, "candle count clamped");
        }
        let endpoint = format!("GET /v1/candles/{}", candle_path(interval));
        let transport = |source| SourceError::Transport {
            endpoint: endpoint.clone(),
            source,
        };

        let request = self.candles_request(market, interval, count).map_err(transport)?;
        let resp = self.client.execute(request).await.map_err(transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let series = parse_candles(&body)?;
        if series.is_empty() {
            return Err(SourceError::Empty {
                market: market.to_string(),
                interval,
            });
        }

        debug!(market, interval = %interval, count = series.len(), "candles fetched");
        Ok(series)
    }
}

impl std::fmt::Debug for UpbitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpbitClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"market":"KRW-BTC","candle_date_time_utc":"2024-03-03T00:00:00","candle_date_time_kst":"2024-03-03T09:00:00",
         "opening_price":87000000.0,"high_price":88500000.0,"low_price":86500000.0,"trade_price":88000000.0,
         "timestamp":1709459999000,"candle_acc_trade_price":1.2e11,"candle_acc_trade_volume":1400.5,
         "prev_closing_price":87000000.0,"change_price":1000000.0,"change_rate":0.0115},
        {"market":"KRW-BTC","candle_date_time_utc":"2024-03-02T00:00:00","candle_date_time_kst":"2024-03-02T09:00:00",
         "opening_price":86000000.0,"high_price":87500000.0,"low_price":85500000.0,"trade_price":87000000.0,
         "timestamp":1709373599000,"candle_acc_trade_price":1.1e11,"candle_acc_trade_volume":1300.25,
         "prev_closing_price":86000000.0,"change_price":1000000.0,"change_rate":0.0116}
    ]"#;

    #[test]
    fn newest_first_payload_is_reordered() {
        let series = parse_candles(SAMPLE).unwrap();
        assert_eq!(series.len(), 2);
        let candles = series.candles();
        assert!(candles[0].timestamp < candles[1].timestamp);
        assert_eq!(candles[0].close, 87_000_000.0);
        assert_eq!(candles[1].open, 87_000_000.0);
        assert_eq!(candles[1].high, 88_500_000.0);
        assert_eq!(candles[1].low, 86_500_000.0);
        assert_eq!(candles[1].volume, 1400.5);
        assert_eq!(series.last_close(), Some(88_000_000.0));
    }

    #[test]
    fn empty_array_parses_to_empty_series() {
        assert!(parse_candles("[]").unwrap().is_empty());
    }

    #[test]
    fn error_object_is_malformed() {
        let body = r#"{"error":{"name":"404","message":"Code not found"}}"#;
        assert!(matches!(parse_candles(body), Err(SourceError::Malformed(_))));
    }

    fn query_of(request: &reqwest::Request) -> Vec<(String, String)> {
        request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn request_clamps_count_and_maps_interval() {
        let client = UpbitClient::new("https://api.upbit.com/").unwrap();
        let request = client.candles_request("KRW-ETH", Interval::Hour4, 500).unwrap();
        assert_eq!(request.url().path(), "/v1/candles/minutes/240");
        assert_eq!(
            query_of(&request),
            vec![
                ("market".to_string(), "KRW-ETH".to_string()),
                ("count".to_string(), "200".to_string()),
            ]
        );

        let request = client.candles_request("KRW-BTC", Interval::Day, 120).unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://api.upbit.com/v1/candles/days?market=KRW-BTC&count=120"
        );
    }

    #[test]
    fn market_cannot_inject_query_parameters() {
        let client = UpbitClient::new(DEFAULT_BASE_URL).unwrap();
        let request = client
            .candles_request("KRW-BTC&COUNT=1&count=1", Interval::Day, 200)
            .unwrap();
        let query = query_of(&request);
        assert_eq!(query.len(), 2);
        assert_eq!(query[0], ("market".to_string(), "KRW-BTC&COUNT=1&count=1".to_string()));
        assert_eq!(query[1], ("count".to_string(), "200".to_string()));
    }

    #[test]
    fn every_interval_has_a_path() {
        for interval in Interval::ALL {
            let path = candle_path(interval);
            assert!(
                path.starts_with("minutes/") || ["days", "weeks", "months"].contains(&path),
                "{interval} -> {path}"
            );
        }
    }
}
