// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators the analysis
// pipeline needs: simple moving averages, a simple-mean RSI and Bollinger
// Bands.  Per-index results are `Option<f64>` so that "not enough history"
// stays distinct from a genuine zero.

pub mod bollinger;
pub mod rsi;
pub mod sma;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::CandleSeries;

pub use rsi::RsiState;

/// Minimum series length before any indicator is computed at all.
pub const MIN_HISTORY: usize = 20;

/// Moving-average periods carried in every [`IndicatorPoint`].
pub const MA_PERIODS: [usize; 4] = [5, 20, 60, 120];

pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_NUM_STD: f64 = 2.0;

/// Indicator values for a single candle index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
    pub ma120: Option<f64>,
    pub rsi14: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
}

impl IndicatorPoint {
    /// True when no indicator has a value at this index.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Indicator values parallel to a [`CandleSeries`]: `points[i]` belongs to
/// candle `i`, and the frame is always exactly as long as the series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorFrame {
    points: Vec<IndicatorPoint>,
}

impl IndicatorFrame {
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[cfg(test)]
    pub fn get(&self, index: usize) -> Option<&IndicatorPoint> {
        self.points.get(index)
    }

    #[cfg(test)]
    pub fn points(&self) -> &[IndicatorPoint] {
        &self.points
    }

    pub fn last(&self) -> Option<&IndicatorPoint> {
        self.points.last()
    }

    pub fn last_ma20(&self) -> Option<f64> {
        self.last().and_then(|p| p.ma20)
    }

    pub fn last_ma60(&self) -> Option<f64> {
        self.last().and_then(|p| p.ma60)
    }

    pub fn last_rsi(&self) -> Option<f64> {
        self.last().and_then(|p| p.rsi14)
    }
}

/// Compute every indicator for `series`.
///
/// A series shorter than [`MIN_HISTORY`] yields a frame of the same length
/// with every value absent; that is a normal outcome, not an error.
pub fn compute(series: &CandleSeries) -> IndicatorFrame {
    let n = series.len();
    if n < MIN_HISTORY {
        debug!(candles = n, "indicator frame left empty: insufficient history");
        return IndicatorFrame {
            points: vec![IndicatorPoint::default(); n],
        };
    }

    let closes = series.closes();
    let [ma5, ma20, ma60, ma120] = MA_PERIODS.map(|p| sma::calculate_sma(&closes, p));
    let rsi14 = rsi::calculate_rsi(&closes, RSI_PERIOD);
    let bands = bollinger::calculate_bollinger(&closes, BOLLINGER_PERIOD, BOLLINGER_NUM_STD);

    let points = (0..n)
        .map(|i| {
            let band = bands[i];
            IndicatorPoint {
                ma5: ma5[i],
                ma20: ma20[i],
                ma60: ma60[i],
                ma120: ma120[i],
                rsi14: rsi14[i],
                bb_middle: band.map(|b| b.middle),
                bb_upper: band.map(|b| b.upper),
                bb_lower: band.map(|b| b.lower),
            }
        })
        .collect();

    IndicatorFrame { points }
}
