// =============================================================================
// Analysis Pipeline — one request, one report
// =============================================================================
//
// Runs the engine components in dependency order over a single candle series:
//
//   indicators ──┬── levels ─────────┐
//                └── volume profile ─┴── trade signals
//
// and packages everything, plus a market summary and a plain-language outlook,
// into an `AnalysisReport`.  Nothing here outlives the call.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicators::{self, IndicatorPoint, RsiState};
use crate::levels::{self, LevelConfig};
use crate::signals::{self, TradePlan, TradeSignal};
use crate::types::{CandleSeries, Interval, PriceLevel};
use crate::volume_profile::{self, VolumeBin, VolumeProfile, DEFAULT_BUCKET_COUNT};

/// Proximity (in percent) under which the price counts as "near" a level.
const NEAR_LEVEL_PCT: f64 = 5.0;
/// Suggested stop-loss as a ratio of the current price.
const STOP_LOSS_RATIO: f64 = 0.95;
/// Number of busiest volume bins listed in the report.
const TOP_VOLUME_BINS: usize = 3;

/// Per-call tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub levels: LevelConfig,
    pub bucket_count: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            levels: LevelConfig::default(),
            bucket_count: DEFAULT_BUCKET_COUNT,
        }
    }
}

/// Headline numbers for the latest candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub current_price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_pct: f64,
    pub last_volume: f64,
    pub rsi: Option<f64>,
    pub rsi_state: Option<RsiState>,
}

impl MarketSummary {
    fn from_series(series: &CandleSeries, rsi: Option<f64>) -> Option<Self> {
        let candles = series.candles();
        let last = candles.last()?;
        let previous_close = candles
            .len()
            .checked_sub(2)
            .map_or(last.close, |i| candles[i].close);
        let change = last.close - previous_close;
        let change_pct = if previous_close != 0.0 {
            change / previous_close * 100.0
        } else {
            0.0
        };

        Some(Self {
            current_price: last.close,
            previous_close,
            change,
            change_pct,
            last_volume: last.volume,
            rsi,
            rsi_state: rsi.map(RsiState::classify),
        })
    }
}

/// A level with its distance from the current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelReport {
    #[serde(flatten)]
    pub level: PriceLevel,
    pub distance_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnalysis {
    pub poc: VolumeBin,
    pub top_bins: Vec<VolumeBin>,
    pub profile: VolumeProfile,
}

/// Reading of the RSI for a trader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RsiOutlook {
    /// RSI < 30.
    StrongBuy,
    /// RSI > 70.
    Sell,
    /// 30 <= RSI <= 50.
    NeutralBuy,
    /// 50 < RSI <= 70.
    NeutralSell,
}

impl RsiOutlook {
    pub fn from_rsi(rsi: f64) -> Self {
        if rsi < 30.0 {
            Self::StrongBuy
        } else if rsi > 70.0 {
            Self::Sell
        } else if rsi <= 50.0 {
            Self::NeutralBuy
        } else {
            Self::NeutralSell
        }
    }
}

/// Where the price sits between the nearest support and resistance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "zone", rename_all = "kebab-case")]
pub enum LevelProximity {
    NearSupport { support: f64, distance_pct: f64 },
    NearResistance { resistance: f64, distance_pct: f64 },
    MidRange { support_distance_pct: f64, resistance_distance_pct: f64 },
}

impl LevelProximity {
    pub fn assess(current_price: f64, support: f64, resistance: f64) -> Self {
        let (support_pct, resistance_pct) = if current_price != 0.0 {
            (
                (current_price - support) / current_price * 100.0,
                (resistance - current_price) / current_price * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        if support_pct < NEAR_LEVEL_PCT {
            Self::NearSupport {
                support,
                distance_pct: support_pct,
            }
        } else if resistance_pct < NEAR_LEVEL_PCT {
            Self::NearResistance {
                resistance,
                distance_pct: resistance_pct,
            }
        } else {
            Self::MidRange {
                support_distance_pct: support_pct,
                resistance_distance_pct: resistance_pct,
            }
        }
    }
}

/// A signal singled out in the outlook, with its distance from the current
/// price (negative below, positive above).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalPick {
    #[serde(flatten)]
    pub signal: TradeSignal,
    pub change_pct: f64,
}

impl SignalPick {
    fn new(signal: TradeSignal, current_price: f64) -> Self {
        Self {
            signal,
            change_pct: signal.change_pct(current_price),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlook {
    pub rsi: Option<RsiOutlook>,
    pub proximity: LevelProximity,
    pub stop_loss: f64,
    pub best_buy: Option<SignalPick>,
    pub best_sell: Option<SignalPick>,
}

/// Everything computed for one (market, interval, series) request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Unique identifier for this report (UUID v4).
    pub id: String,
    pub market: String,
    pub interval: Interval,
    pub candles: usize,
    pub summary: MarketSummary,
    /// Indicator values of the last candle.
    pub indicators: IndicatorPoint,
    pub supports: Vec<LevelReport>,
    pub resistances: Vec<LevelReport>,
    pub volume: Option<VolumeAnalysis>,
    /// `None` means "insufficient data for a recommendation".
    pub plan: Option<TradePlan>,
    pub outlook: Option<Outlook>,
    /// ISO 8601 timestamp of when this report was created.
    pub created_at: String,
}

/// Run the whole pipeline. Returns `None` only for an empty series.
pub fn analyze(
    market: &str,
    interval: Interval,
    series: &CandleSeries,
    params: &AnalysisParams,
) -> Option<AnalysisReport> {
    let frame = indicators::compute(series);
    let summary = MarketSummary::from_series(series, frame.last_rsi())?;
    let current_price = summary.current_price;

    let detected = levels::detect(series, &frame, &params.levels);
    let profile = volume_profile::build(series, params.bucket_count);
    let plan = signals::synthesize(series, &frame, &detected, &profile, &params.levels);

    let supports = describe_levels(&detected.supports, current_price);
    let resistances = describe_levels(&detected.resistances, current_price);

    let volume = profile.poc().copied().map(|poc| VolumeAnalysis {
        poc,
        top_bins: profile.top_bins(TOP_VOLUME_BINS),
        profile: profile.clone(),
    });

    let outlook = plan.as_ref().map(|plan| Outlook {
        rsi: summary.rsi.map(RsiOutlook::from_rsi),
        proximity: LevelProximity::assess(current_price, plan.nearest_support, plan.nearest_resistance),
        stop_loss: current_price * STOP_LOSS_RATIO,
        best_buy: plan
            .best_buy(current_price)
            .map(|&s| SignalPick::new(s, current_price)),
        best_sell: plan
            .best_sell(current_price)
            .map(|&s| SignalPick::new(s, current_price)),
    });

    debug!(
        market,
        interval = %interval,
        candles = series.len(),
        supports = supports.len(),
        resistances = resistances.len(),
        has_plan = plan.is_some(),
        "analysis complete"
    );

    Some(AnalysisReport {
        id: uuid::Uuid::new_v4().to_string(),
        market: market.to_string(),
        interval,
        candles: series.len(),
        summary,
        indicators: frame.last().copied().unwrap_or_default(),
        supports,
        resistances,
        volume,
        plan,
        outlook,
        created_at: chrono::Utc::now().to_rfc3339(),
    })
}

fn describe_levels(levels: &[PriceLevel], current_price: f64) -> Vec<LevelReport> {
    levels
        .iter()
        .map(|&level| LevelReport {
            level,
            distance_pct: level.distance_pct(current_price),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Candle;

    fn series_from_closes(closes: &[f64]) -> CandleSeries {
        CandleSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| Candle::new(i as i64 * 86_400_000, c, c * 1.01, c * 0.99, c, 1_000.0 + i as f64))
                .collect(),
        )
    }

    #[test]
    fn empty_series_has_no_report() {
        assert!(analyze("KRW-BTC", Interval::Day, &CandleSeries::default(), &AnalysisParams::default()).is_none());
    }

    #[test]
    fn short_series_reports_without_plan() {
        let series = series_from_closes(&[100.0, 110.0, 99.0]);
        let report = analyze("KRW-BTC", Interval::Day, &series, &AnalysisParams::default()).unwrap();
        assert_eq!(report.candles, 3);
        assert!(report.plan.is_none());
        assert!(report.outlook.is_none());
        assert!(report.indicators.is_empty());
        assert!(report.volume.is_some());
        assert_eq!(report.summary.previous_close, 110.0);
        assert!((report.summary.change - -11.0).abs() < 1e-9);
        assert!((report.summary.change_pct - -10.0).abs() < 1e-9);
    }

    #[test]
    fn single_candle_summary_has_no_change() {
        let report = analyze("KRW-ETH", Interval::Hour1, &series_from_closes(&[42.0]), &AnalysisParams::default()).unwrap();
        assert_eq!(report.summary.previous_close, 42.0);
        assert_eq!(report.summary.change, 0.0);
        assert_eq!(report.summary.change_pct, 0.0);
        assert_eq!(report.summary.last_volume, 1_000.0);
    }

    #[test]
    fn full_report_for_long_series() {
        let closes: Vec<f64> = (0..200)
            .map(|i| 50_000.0 + 3_000.0 * (i as f64 / 11.0).sin() + 10.0 * i as f64)
            .collect();
        let series = series_from_closes(&closes);
        let report = analyze("KRW-BTC", Interval::Day, &series, &AnalysisParams::default()).unwrap();

        let current = report.summary.current_price;
        assert!(report.supports.iter().all(|l| l.level.price < current && l.distance_pct > 0.0));
        assert!(report.resistances.iter().all(|l| l.level.price > current && l.distance_pct > 0.0));

        let volume = report.volume.as_ref().unwrap();
        assert_eq!(volume.top_bins.len(), 3);
        assert_eq!(volume.top_bins[0].volume, volume.poc.volume);
        assert_eq!(volume.profile.len(), 49);

        let plan = report.plan.as_ref().unwrap();
        let outlook = report.outlook.as_ref().unwrap();
        assert!((outlook.stop_loss - current * 0.95).abs() < 1e-6);
        assert_eq!(outlook.best_buy.is_some(), !plan.buy_signals.is_empty());
        assert!(outlook.best_sell.is_some());
        assert!(report.summary.rsi.is_some());
        assert!(outlook.rsi.is_some());
        assert_eq!(uuid::Uuid::parse_str(&report.id).unwrap().get_version_num(), 4);
    }

    #[test]
    fn report_serialises_to_json() {
        let closes: Vec<f64> = (0..60).map(|i| 1_000.0 + i as f64).collect();
        let report = analyze("KRW-SOL", Interval::Hour4, &series_from_closes(&closes), &AnalysisParams::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["market"], "KRW-SOL");
        assert_eq!(json["interval"], "4h");
        assert!(json["plan"]["buy_signals"].is_array());
        assert!(json["indicators"]["ma120"].is_null());
        assert!(json["indicators"]["ma20"].is_number());
    }

    #[test]
    fn absent_sections_serialise_as_null() {
        let report = analyze("KRW-XRP", Interval::Day, &series_from_closes(&[10.0, 11.0, 12.0]), &AnalysisParams::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        let obj = json.as_object().unwrap();
        for key in ["plan", "outlook"] {
            assert!(obj.contains_key(key), "{key} missing");
            assert!(obj[key].is_null());
        }
        assert!(obj["volume"].is_object());

        let params = AnalysisParams {
            bucket_count: 1,
            ..AnalysisParams::default()
        };
        let json = serde_json::to_value(analyze("KRW-XRP", Interval::Day, &series_from_closes(&[10.0]), &params).unwrap()).unwrap();
        assert!(json.as_object().unwrap().contains_key("volume"));
        assert!(json["volume"].is_null());
    }

    #[test]
    fn best_picks_carry_change_from_current() {
        let closes: Vec<f64> = (0..120)
            .map(|i| 20_000.0 + 1_500.0 * (i as f64 / 7.0).sin())
            .collect();
        let report = analyze("KRW-ETH", Interval::Day, &series_from_closes(&closes), &AnalysisParams::default()).unwrap();
        let current = report.summary.current_price;
        let outlook = report.outlook.unwrap();
        let sell = outlook.best_sell.unwrap();
        assert!((sell.change_pct - (sell.signal.price - current) / current * 100.0).abs() < 1e-9);
        if let Some(buy) = outlook.best_buy {
            assert!((buy.change_pct - (buy.signal.price - current) / current * 100.0).abs() < 1e-9);
        }

        let json = serde_json::to_value(&sell).unwrap();
        assert!(json["reason"].is_string());
        assert!(json["change_pct"].is_number());
    }

    #[test]
    fn rsi_outlook_bands() {
        assert_eq!(RsiOutlook::from_rsi(29.0), RsiOutlook::StrongBuy);
        assert_eq!(RsiOutlook::from_rsi(30.0), RsiOutlook::NeutralBuy);
        assert_eq!(RsiOutlook::from_rsi(50.0), RsiOutlook::NeutralBuy);
        assert_eq!(RsiOutlook::from_rsi(50.1), RsiOutlook::NeutralSell);
        assert_eq!(RsiOutlook::from_rsi(70.0), RsiOutlook::NeutralSell);
        assert_eq!(RsiOutlook::from_rsi(70.1), RsiOutlook::Sell);
    }

    #[test]
    fn proximity_prefers_support_then_resistance() {
        assert!(matches!(
            LevelProximity::assess(100.0, 97.0, 103.0),
            LevelProximity::NearSupport { .. }
        ));
        assert!(matches!(
            LevelProximity::assess(100.0, 90.0, 103.0),
            LevelProximity::NearResistance { .. }
        ));
        match LevelProximity::assess(100.0, 85.0, 115.0) {
            LevelProximity::MidRange {
                support_distance_pct,
                resistance_distance_pct,
            } => {
                assert!((support_distance_pct - 15.0).abs() < 1e-9);
                assert!((resistance_distance_pct - 15.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
