// =============================================================================
// Trade Signal Synthesizer
// =============================================================================
//
// Fuses the indicator frame, the detected levels and the volume profile into
// ranked buy / sell price recommendations.
//
// Pipeline:
//   1. current price = last close, RSI = last RSI14 (50 if absent)
//   2. the POC joins the supports (below price) or resistances (above price)
//      of a working copy of the levels
//   3. the working levels are re-normalised exactly like the detector output
//   4. nearest support / resistance fall back to ±15% bands
//   5. volatility = σ(last 20 closes) / price, clamped to [2%, 10%]
//   6. every buy / sell rule is evaluated independently
//   7. the hits are ranked: buys by price descending, sells ascending

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::trade_signal::{Side, SignalContext, SignalReason, TradeSignal};
use crate::indicators::sma::sample_std_dev;
use crate::indicators::IndicatorFrame;
use crate::levels::{self, LevelConfig, Levels};
use crate::types::{CandleSeries, LevelKind};
use crate::volume_profile::VolumeProfile;

/// Minimum number of candles before any signal is produced.
pub const MIN_CANDLES: usize = 20;

/// Neutral RSI used when the frame has no RSI for the last candle.
pub const NEUTRAL_RSI: f64 = 50.0;

pub const VOLATILITY_LOOKBACK: usize = 20;
pub const MIN_VOLATILITY: f64 = 0.02;
pub const MAX_VOLATILITY: f64 = 0.10;

/// Fallback distance of the nearest support / resistance when none exists.
const FALLBACK_SUPPORT_RATIO: f64 = 0.85;
const FALLBACK_RESISTANCE_RATIO: f64 = 1.15;

/// Output of [`synthesize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    /// Strictly descending by price.
    pub buy_signals: Vec<TradeSignal>,
    /// Strictly ascending by price.
    pub sell_signals: Vec<TradeSignal>,
    pub nearest_support: f64,
    pub nearest_resistance: f64,
    pub volatility_factor: f64,
    /// Working levels after POC injection and re-normalisation.
    pub levels: Levels,
}

impl TradePlan {
    /// Buy signal whose price is closest to `current_price`.
    pub fn best_buy(&self, current_price: f64) -> Option<&TradeSignal> {
        closest(&self.buy_signals, current_price)
    }

    /// Sell signal whose price is closest to `current_price`.
    pub fn best_sell(&self, current_price: f64) -> Option<&TradeSignal> {
        closest(&self.sell_signals, current_price)
    }
}

fn closest(signals: &[TradeSignal], current_price: f64) -> Option<&TradeSignal> {
    signals.iter().min_by(|a, b| {
        (a.price - current_price)
            .abs()
            .total_cmp(&(b.price - current_price).abs())
    })
}

/// Build the trade plan. Returns `None` when the series is shorter than
/// [`MIN_CANDLES`]; no other input can make it fail.
///
/// `levels` is read-only: POC injection works on a copy.
pub fn synthesize(
    series: &CandleSeries,
    indicators: &IndicatorFrame,
    levels: &Levels,
    profile: &VolumeProfile,
    config: &LevelConfig,
) -> Option<TradePlan> {
    if series.len() < MIN_CANDLES {
        debug!(candles = series.len(), "signal synthesis skipped: insufficient data");
        return None;
    }
    let current_price = series.last_close()?;
    let rsi = indicators.last_rsi().unwrap_or(NEUTRAL_RSI);

    // --- POC injection into working copies -----------------------------------
    let mut supports: Vec<f64> = levels.supports.iter().map(|l| l.price).collect();
    let mut resistances: Vec<f64> = levels.resistances.iter().map(|l| l.price).collect();

    let poc = profile.poc_price();
    if let Some(p) = poc {
        if p < current_price {
            supports.push(p);
        } else if p > current_price {
            resistances.push(p);
        }
    }

    let working = Levels {
        supports: levels::normalize(&supports, current_price, LevelKind::Support, config),
        resistances: levels::normalize(&resistances, current_price, LevelKind::Resistance, config),
    };

    let nearest_support = working
        .nearest_support()
        .unwrap_or(current_price * FALLBACK_SUPPORT_RATIO);
    let nearest_resistance = working
        .nearest_resistance()
        .unwrap_or(current_price * FALLBACK_RESISTANCE_RATIO);

    let volatility = volatility_factor(&series.closes(), current_price);

    let ctx = SignalContext {
        current_price,
        rsi,
        volatility,
        support: working.nearest_support(),
        resistance: working.nearest_resistance(),
        poc,
        ma20: indicators.last_ma20(),
    };

    let buy_signals = rank(
        SignalReason::BUY_RULES.iter().filter_map(|r| r.evaluate(&ctx)).collect(),
        Side::Buy,
    );
    let sell_signals = rank(
        SignalReason::SELL_RULES.iter().filter_map(|r| r.evaluate(&ctx)).collect(),
        Side::Sell,
    );

    debug!(
        current_price,
        rsi,
        volatility,
        buys = buy_signals.len(),
        sells = sell_signals.len(),
        "trade signals synthesized"
    );

    Some(TradePlan {
        buy_signals,
        sell_signals,
        nearest_support,
        nearest_resistance,
        volatility_factor: volatility,
        levels: working,
    })
}

/// Relative volatility of the last [`VOLATILITY_LOOKBACK`] closes, clamped to
/// `[MIN_VOLATILITY, MAX_VOLATILITY]`.
///
/// A non-positive price or an undefined deviation gives the floor value.
pub fn volatility_factor(closes: &[f64], current_price: f64) -> f64 {
    if current_price <= 0.0 {
        return MIN_VOLATILITY;
    }
    let tail = &closes[closes.len().saturating_sub(VOLATILITY_LOOKBACK)..];
    sample_std_dev(tail)
        .map(|sd| sd / current_price)
        .filter(|v| v.is_finite())
        .map_or(MIN_VOLATILITY, |v| v.clamp(MIN_VOLATILITY, MAX_VOLATILITY))
}

/// Order signals for `side` and collapse duplicates.
///
/// Exact (reason, price, confidence) repeats are removed, and so is any
/// signal whose price equals one already kept: the survivor is the one with
/// the highest confidence, then the earliest rule. This keeps buy prices
/// strictly descending and sell prices strictly ascending. Signals of the
/// other side are dropped.
fn rank(mut signals: Vec<TradeSignal>, side: Side) -> Vec<TradeSignal> {
    signals.retain(|s| s.side() == side);
    signals.sort_by(|a, b| {
        let by_price = match side {
            Side::Buy => b.price.total_cmp(&a.price),
            Side::Sell => a.price.total_cmp(&b.price),
        };
        by_price.then(b.confidence.cmp(&a.confidence))
    });
    signals.dedup_by(|later, kept| later.price == kept.price);
    signals
}
