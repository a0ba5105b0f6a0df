// =============================================================================
// Volume Profile — traded volume bucketed by price
// =============================================================================
//
// The series' full price range [min(low), max(high)] is cut by `bucket_count`
// evenly spaced edges into `bucket_count - 1` buckets.  A candle contributes
// its *entire* volume to every bucket its [low, high] range touches
// (inclusive on both ends), so a wide candle is counted several times.  The
// result approximates "volume active at this price" rather than an exact
// volume-weighted distribution, and bin totals can exceed the series volume.
//
// The Point of Control (POC) is the bucket with the largest total; on a tie
// the lowest-priced bucket wins.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::CandleSeries;

/// Default number of bucket edges.
pub const DEFAULT_BUCKET_COUNT: usize = 50;

/// One price bucket `[low, high)` with its accumulated volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBin {
    pub low: f64,
    pub high: f64,
    /// Bucket midpoint, reported as the bucket's price.
    pub price: f64,
    pub volume: f64,
}

/// Volume bins ordered by price ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeProfile {
    bins: Vec<VolumeBin>,
}

impl VolumeProfile {
    pub fn bins(&self) -> &[VolumeBin] {
        &self.bins
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Point of Control: the first (lowest-priced) bin holding the maximal
    /// volume.
    pub fn poc(&self) -> Option<&VolumeBin> {
        let mut best: Option<&VolumeBin> = None;
        for bin in &self.bins {
            match best {
                Some(b) if bin.volume <= b.volume => {}
                _ => best = Some(bin),
            }
        }
        best
    }

    pub fn poc_price(&self) -> Option<f64> {
        self.poc().map(|b| b.price)
    }

    /// The `n` busiest bins, highest volume first; equal volumes keep price
    /// order.
    pub fn top_bins(&self, n: usize) -> Vec<VolumeBin> {
        let mut bins = self.bins.clone();
        bins.sort_by(|a, b| b.volume.total_cmp(&a.volume));
        bins.truncate(n);
        bins
    }

    /// Sum over all bins. Exceeds the series volume whenever a candle spans
    /// more than one bucket.
    pub fn total_binned_volume(&self) -> f64 {
        self.bins.iter().map(|b| b.volume).sum()
    }
}

/// Build the volume profile of `series` with `bucket_count` edges.
///
/// - empty series or `bucket_count < 2` => empty profile
/// - zero price range (every low and high identical) => a single bin
///   `[p, p]` holding the whole series volume
pub fn build(series: &CandleSeries, bucket_count: usize) -> VolumeProfile {
    let candles = series.candles();
    if candles.is_empty() || bucket_count < 2 {
        return VolumeProfile::default();
    }

    let min_low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let max_high = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);

    if max_high <= min_low {
        debug!(price = min_low, "volume profile: zero price range, single bin");
        let volume = candles.iter().map(|c| c.volume).sum();
        return VolumeProfile {
            bins: vec![VolumeBin {
                low: min_low,
                high: min_low,
                price: min_low,
                volume,
            }],
        };
    }

    let step = (max_high - min_low) / (bucket_count - 1) as f64;
    let edges: Vec<f64> = (0..bucket_count)
        .map(|k| {
            if k == bucket_count - 1 {
                max_high
            } else {
                min_low + step * k as f64
            }
        })
        .collect();

    let bins: Vec<VolumeBin> = edges
        .windows(2)
        .map(|e| {
            let (low, high) = (e[0], e[1]);
            let volume = candles
                .iter()
                .filter(|c| c.low <= high && c.high >= low)
                .map(|c| c.volume)
                .sum();
            VolumeBin {
                low,
                high,
                price: (low + high) / 2.0,
                volume,
            }
        })
        .collect();

    debug!(
        bins = bins.len(),
        min_low,
        max_high,
        "volume profile built"
    );

    VolumeProfile { bins }
}
