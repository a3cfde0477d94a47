//! Small numeric helpers

use crate::{Error, Result};

fn ensure_finite(value: f64, what: &str) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("{what} must be finite, got {value}")))
    }
}

fn sorted_finite(values: &[f64]) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(Error::InvalidInput("values must be non-empty".to_string()));
    }
    for &value in values {
        ensure_finite(value, "values")?;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(sorted)
}

/// Midrank percentile of `value` in an already-sorted slice
#[allow(clippy::cast_precision_loss)]
fn midrank(value: f64, sorted: &[f64]) -> f64 {
    let below = sorted.partition_point(|v| *v < value);
    let through = sorted.partition_point(|v| *v <= value);
    let rank = (below + through) as f64 / 2.0;
    rank / sorted.len() as f64 * 100.0
}

/// Percentile rank of `value` within `values`
///
/// Counts entries below `value` plus half of those equal to it.
///
/// # Errors
///
/// Returns error if `values` is empty or anything is non-finite
pub fn percentile_rank(value: f64, values: &[f64]) -> Result<f64> {
    ensure_finite(value, "value")?;
    let sorted = sorted_finite(values)?;
    Ok(midrank(value, &sorted))
}

/// Mean midrank percentile of every entry in `values`
///
/// # Errors
///
/// Returns error if `values` is empty or contains non-finite entries
pub fn average_percentile(values: &[f64]) -> Result<f64> {
    let sorted = sorted_finite(values)?;
    let total: f64 = values.iter().map(|&v| midrank(v, &sorted)).sum();
    #[allow(clippy::cast_precision_loss)]
    let count = values.len() as f64;
    Ok(total / count)
}

/// Clamp `value` into `[lo, hi]`
///
/// # Errors
///
/// Returns error if any argument is non-finite or `lo > hi`
pub fn clamp(value: f64, lo: f64, hi: f64) -> Result<f64> {
    ensure_finite(value, "value")?;
    ensure_finite(lo, "lo")?;
    ensure_finite(hi, "hi")?;
    if lo > hi {
        return Err(Error::InvalidInput(format!(
            "lo must not exceed hi ({lo} > {hi})"
        )));
    }
    Ok(value.clamp(lo, hi))
}
