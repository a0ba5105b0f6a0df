// =============================================================================
// Simple Moving Average & rolling dispersion helpers
// =============================================================================

/// Compute the simple moving average of `values` over `period`, aligned to the
/// input: element `i` is the mean of `values[i + 1 - period ..= i]`, or `None`
/// while fewer than `period` values are available.
///
/// `period == 0` yields a vector of `None`.
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                None
            } else {
                mean(&values[i + 1 - period..=i])
            }
        })
        .collect()
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (divisor `n - 1`).
///
/// Returns `None` for fewer than two values, where the sample estimator is
/// undefined.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}
