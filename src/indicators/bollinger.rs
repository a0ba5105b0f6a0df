// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), where σ is the *sample* standard deviation of
// the closes in the same window.

use serde::{Deserialize, Serialize};

use super::sma::{mean, sample_std_dev};

/// Bands for a single candle index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBand {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Calculate Bollinger Bands for every index of `closes`.
///
/// Element `i` is `None` while fewer than `period` closes are available, and
/// for `period < 2` (the sample deviation needs at least two points).
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> Vec<Option<BollingerBand>> {
    if period < 2 {
        return vec![None; closes.len()];
    }

    (0..closes.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &closes[i + 1 - period..=i];
            let middle = mean(window)?;
            let half_width = num_std * sample_std_dev(window)?;
            Some(BollingerBand {
                upper: middle + half_width,
                middle,
                lower: middle - half_width,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let bands = calculate_bollinger(&closes, 20, 2.0);
        let bb = bands[19].unwrap();
        assert!((bb.middle - 10.5).abs() < 1e-12);
        assert!(bb.upper > bb.middle);
        assert!(bb.lower < bb.middle);
        assert!(((bb.upper - bb.middle) - (bb.middle - bb.lower)).abs() < 1e-12);
        // Sample variance of 1..=20 is 35.
        assert!((bb.upper - (10.5 + 2.0 * 35.0_f64.sqrt())).abs() < 1e-9);
    }

    #[test]
    fn bollinger_insufficient_data() {
        let bands = calculate_bollinger(&[1.0, 2.0, 3.0], 20, 2.0);
        assert_eq!(bands.len(), 3);
        assert!(bands.iter().all(Option::is_none));
    }

    #[test]
    fn bollinger_flat() {
        let bands = calculate_bollinger(&[100.0; 25], 20, 2.0);
        let bb = bands[24].unwrap();
        assert_eq!(bb.upper, 100.0);
        assert_eq!(bb.lower, 100.0);
    }
}
