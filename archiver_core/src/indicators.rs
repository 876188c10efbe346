// archiver_core/src/indicators.rs

//! Series indicators.
//!
//! Pure functions over ordered value sequences used to build the reporting
//! series:
//! - Simple Moving Average over the last `n` values (`sma`)
//! - Trailing rolling mean for every index (`rolling_mean`)
//! - Arithmetic mean of a whole series (`global_mean`)
//! - Difference of two optional observations (`delta`)
//!
//! Insufficient history is reported as `None`, never as zero.

/// Computes the **Simple Moving Average (SMA)** over the last `n` data points.
///
/// # Arguments
/// * `values` - Historical values, oldest first.
/// * `n` - The lookback period. Must be ≥ 1.
///
/// # Returns
/// * `Some(f64)` - The computed SMA value.
/// * `None` - If `n == 0` or fewer than `n` data points are available.
pub fn sma<'a, I>(
    values: I,
    n: usize,
) -> Option<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    if n == 0 { return None; }

    let data: Vec<f64> = values.into_iter().copied().collect();
    let total_count = data.len();
    if total_count < n { return None; }

    let start = total_count - n;
    let sum: f64 = data[start..].iter().sum();
    Some(sum / (n as f64))
}

/// Trailing mean with a strict window: index `i` averages `values[i+1-n..=i]`.
/// The first `n - 1` indices have no value yet.
pub fn rolling_mean(values: &[f64], n: usize) -> Vec<Option<f64>> {
    if n == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| if i + 1 < n { None } else { sma(&values[i + 1 - n..=i], n) })
        .collect()
}

/// Arithmetic mean of all values.
///
/// # Returns
/// * `Err` when `values` is empty.
pub fn global_mean(values: &[f64]) -> anyhow::Result<f64> {
    if values.is_empty() {
        anyhow::bail!("Cannot compute the mean of an empty series");
    }
    anyhow::Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// `current - previous` when both sides are known.
pub fn delta(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    Some(current? - previous?)
}
