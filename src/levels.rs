// =============================================================================
// Support / Resistance Detection
// =============================================================================
//
// Candidate levels come from two places:
//   1. Pivots: bars whose high (low) equals the highest high (lowest low) of
//      the centred window [i - window, i + window].
//   2. Dynamic levels: the latest MA20 / MA60, placed on whichever side of
//      the current price they sit.
//
// Candidates are then normalised: anything on the wrong side of the current
// price is dropped, the rest is rounded to the configured granularity,
// deduplicated, ordered closest-first and capped.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicators::IndicatorFrame;
use crate::types::{CandleSeries, LevelKind, PriceLevel};

/// Tunables for level detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Half-width of the centred pivot window.
    pub window: usize,
    /// Levels are rounded to the nearest multiple of this; `<= 0` disables
    /// rounding.
    pub granularity: f64,
    /// Maximum number of levels reported per side.
    pub max_levels: usize,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            window: 20,
            granularity: 10.0,
            max_levels: 10,
        }
    }
}

/// Supports ordered descending and resistances ordered ascending, so the first
/// entry of each list is the level closest to the current price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    pub supports: Vec<PriceLevel>,
    pub resistances: Vec<PriceLevel>,
}

impl Levels {
    pub fn nearest_support(&self) -> Option<f64> {
        self.supports.first().map(|l| l.price)
    }

    pub fn nearest_resistance(&self) -> Option<f64> {
        self.resistances.first().map(|l| l.price)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.supports.is_empty() && self.resistances.is_empty()
    }
}

/// Detect support and resistance levels for `series`.
///
/// Returns empty lists when the series is shorter than `config.window`.
pub fn detect(series: &CandleSeries, indicators: &IndicatorFrame, config: &LevelConfig) -> Levels {
    let Some(current_price) = series.last_close() else {
        return Levels::default();
    };
    if series.len() < config.window {
        debug!(
            candles = series.len(),
            window = config.window,
            "level detection skipped: series shorter than window"
        );
        return Levels::default();
    }

    let (mut support_candidates, mut resistance_candidates) = pivot_candidates(series, config.window);

    // --- Dynamic levels from moving averages ---------------------------------
    let mut dynamic = Vec::with_capacity(2);
    if series.len() >= 20 {
        dynamic.extend(indicators.last_ma20());
    }
    if series.len() >= 60 {
        dynamic.extend(indicators.last_ma60());
    }
    for ma in dynamic {
        if ma < current_price {
            support_candidates.push(ma);
        } else {
            resistance_candidates.push(ma);
        }
    }

    let levels = Levels {
        supports: normalize(&support_candidates, current_price, LevelKind::Support, config),
        resistances: normalize(&resistance_candidates, current_price, LevelKind::Resistance, config),
    };

    debug!(
        current_price,
        support_candidates = support_candidates.len(),
        resistance_candidates = resistance_candidates.len(),
        supports = levels.supports.len(),
        resistances = levels.resistances.len(),
        "levels detected"
    );

    levels
}

/// Pivot extraction over the centred window `[i - window, i + window]`.
///
/// Every matching bar produces its own candidate, so equal extremes in
/// overlapping windows show up more than once until [`normalize`] dedupes.
fn pivot_candidates(series: &CandleSeries, window: usize) -> (Vec<f64>, Vec<f64>) {
    let candles = series.candles();
    let mut supports = Vec::new();
    let mut resistances = Vec::new();

    if candles.len() <= 2 * window {
        return (supports, resistances);
    }

    for i in window..candles.len() - window {
        let span = &candles[i - window..=i + window];
        let rolling_max = span.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let rolling_min = span.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

        if candles[i].high == rolling_max {
            resistances.push(candles[i].high);
        }
        if candles[i].low == rolling_min {
            supports.push(candles[i].low);
        }
    }

    (supports, resistances)
}

/// Filter, round, dedupe, order closest-first and cap a set of candidate
/// prices for one side of `current_price`.
///
/// The side filter runs again after rounding: rounding may push a level
/// across the current price, and such a level is dropped.
pub fn normalize(
    candidates: &[f64],
    current_price: f64,
    kind: LevelKind,
    config: &LevelConfig,
) -> Vec<PriceLevel> {
    let on_side = |p: f64| match kind {
        LevelKind::Support => p < current_price,
        LevelKind::Resistance => p > current_price,
    };

    let mut prices: Vec<f64> = candidates
        .iter()
        .copied()
        .filter(|&p| on_side(p))
        .map(|p| round_to_granularity(p, config.granularity))
        .filter(|&p| on_side(p))
        .collect();

    match kind {
        LevelKind::Support => prices.sort_by(|a, b| b.total_cmp(a)),
        LevelKind::Resistance => prices.sort_by(|a, b| a.total_cmp(b)),
    }
    prices.dedup();
    prices.truncate(config.max_levels);

    prices.into_iter().map(|price| PriceLevel { price, kind }).collect()
}

/// Round `price` to the nearest multiple of `granularity` (halves away from
/// zero). A non-positive granularity leaves the price unchanged.
pub fn round_to_granularity(price: f64, granularity: f64) -> f64 {
    if granularity <= 0.0 || !granularity.is_finite() {
        return price;
    }
    (price / granularity).round() * granularity
}
