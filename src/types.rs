// =============================================================================
// Shared types used across the candle analytics engine
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Candles
// =============================================================================

/// A single OHLCV bar for a fixed time interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time, UNIX milliseconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Time-ordered (ascending) candle sequence.
///
/// The engine only ever borrows a series; indicator values are produced as a
/// parallel [`IndicatorFrame`](crate::indicators::IndicatorFrame) instead of
/// being written back into the candles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Wrap candles that are already in ascending timestamp order.
    #[cfg(test)]
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    /// Build a series from candles in any order (exchange APIs commonly return
    /// newest-first). Sorting is stable, so equal timestamps keep their order.
    pub fn from_unordered(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Close of the most recent candle, i.e. the "current price".
    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }
}

// =============================================================================
// Intervals
// =============================================================================

/// Candle interval supported by the candle sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    #[default]
    Day,
    #[serde(rename = "1w")]
    Week,
    #[serde(rename = "1M")]
    Month,
}

impl Interval {
    pub const ALL: [Interval; 9] = [
        Self::Minute1,
        Self::Minute5,
        Self::Minute15,
        Self::Minute30,
        Self::Hour1,
        Self::Hour4,
        Self::Day,
        Self::Week,
        Self::Month,
    ];

    /// Short code, e.g. `"4h"`.
    pub fn code(self) -> &'static str {
        match self {
            Self::Minute1 => "1m",
            Self::Minute5 => "5m",
            Self::Minute15 => "15m",
            Self::Minute30 => "30m",
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Day => "1d",
            Self::Week => "1w",
            Self::Month => "1M",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error returned when an interval string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown candle interval: '{0}'")]
pub struct UnknownInterval(pub String);

impl FromStr for Interval {
    type Err = UnknownInterval;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" (month) and "1m" (minute) differ only by case.
        if let Some(iv) = Self::ALL.iter().find(|iv| iv.code() == s) {
            return Ok(*iv);
        }
        match s.to_lowercase().as_str() {
            "minute" | "minutes" => Ok(Self::Minute1),
            "60m" | "hour" => Ok(Self::Hour1),
            "240m" => Ok(Self::Hour4),
            "d" | "day" | "days" | "daily" => Ok(Self::Day),
            "w" | "week" | "weeks" | "weekly" => Ok(Self::Week),
            "month" | "months" | "monthly" => Ok(Self::Month),
            _ => Err(UnknownInterval(s.to_string())),
        }
    }
}

// =============================================================================
// Price levels
// =============================================================================

/// Side of the current price a level sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LevelKind {
    Support,
    Resistance,
}

impl std::fmt::Display for LevelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Support => write!(f, "support"),
            Self::Resistance => write!(f, "resistance"),
        }
    }
}

/// A support or resistance price. Provenance (pivot, moving average, POC) is
/// not retained once the level has been emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub kind: LevelKind,
}

impl PriceLevel {
    /// Absolute distance from `current_price` as a percentage of it.
    /// Returns 0 when `current_price` is zero.
    pub fn distance_pct(&self, current_price: f64) -> f64 {
        if current_price == 0.0 {
            return 0.0;
        }
        (self.price - current_price).abs() / current_price * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_unordered_sorts_ascending() {
        let series = CandleSeries::from_unordered(vec![
            Candle::new(3, 1.0, 1.0, 1.0, 3.0, 1.0),
            Candle::new(1, 1.0, 1.0, 1.0, 1.0, 1.0),
            Candle::new(2, 1.0, 1.0, 1.0, 2.0, 1.0),
        ]);
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.last_close(), Some(3.0));
    }

    #[test]
    fn empty_series_has_no_last_close() {
        assert_eq!(CandleSeries::default().last_close(), None);
    }

    #[test]
    fn interval_parses_codes_and_names() {
        assert_eq!("1m".parse::<Interval>().unwrap(), Interval::Minute1);
        assert_eq!("1M".parse::<Interval>().unwrap(), Interval::Month);
        assert_eq!("4h".parse::<Interval>().unwrap(), Interval::Hour4);
        assert_eq!("days".parse::<Interval>().unwrap(), Interval::Day);
        assert_eq!("Weekly".parse::<Interval>().unwrap(), Interval::Week);
        assert!("2d".parse::<Interval>().is_err());
    }

    #[test]
    fn interval_serde_uses_codes() {
        let json = serde_json::to_string(&Interval::Hour4).unwrap();
        assert_eq!(json, "\"4h\"");
        let back: Interval = serde_json::from_str("\"1w\"").unwrap();
        assert_eq!(back, Interval::Week);
    }

    #[test]
    fn level_distance_pct() {
        let level = PriceLevel {
            price: 95.0,
            kind: LevelKind::Support,
        };
        assert!((level.distance_pct(100.0) - 5.0).abs() < 1e-10);
        assert_eq!(level.distance_pct(0.0), 0.0);
    }
}
