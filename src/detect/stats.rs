//! Robust statistics shared by the detectors.

use crate::constants::MAD_TO_SIGMA;

/// Median of `values`. Returns 0.0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut buf = values.to_vec();
    median_in_place(&mut buf)
}

fn median_in_place(buf: &mut [f64]) -> f64 {
    let n = buf.len();
    let mid = n / 2;
    let (lower, upper, _) = buf.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        upper
    } else {
        let lower_max = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        0.5 * (lower_max + upper)
    }
}

/// Median absolute deviation around `center`.
pub fn mad(values: &[f64], center: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median_in_place(&mut deviations)
}

/// Robust spread estimate: MAD scaled to a normal standard deviation.
pub fn robust_sigma(values: &[f64], center: f64) -> f64 {
    MAD_TO_SIGMA * mad(values, center)
}

/// Percentile with linear interpolation between closest ranks.
///
/// `pct` is in [0, 100]. Returns 0.0 for an empty slice.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    #[allow(clippy::cast_precision_loss)]
    let rank = pct.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = rank - rank.floor();
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    values.iter().sum::<f64>() / n
}

/// Population coefficient of variation (std / mean).
///
/// Returns `None` when the mean is not positive.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values);
    if values.is_empty() || m <= 0.0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    Some(var.sqrt() / m)
}

/// Total length of the union of `[start, end]` intervals.
pub fn union_length(intervals: &[(f64, f64)]) -> f64 {
    let mut sorted: Vec<(f64, f64)> = intervals
        .iter()
        .copied()
        .filter(|(s, e)| e > s)
        .collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut total = 0.0;
    let mut current: Option<(f64, f64)> = None;
    for (start, end) in sorted {
        match current {
            Some((cs, ce)) if start <= ce => current = Some((cs, ce.max(end))),
            Some((cs, ce)) => {
                total += ce - cs;
                current = Some((start, end));
            }
            None => current = Some((start, end)),
        }
    }
    if let Some((cs, ce)) = current {
        total += ce - cs;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-12);
        assert!((median(&[4.0, 1.0, 3.0, 2.0]) - 2.5).abs() < 1e-12);
        assert!(median(&[]).abs() < 1e-12);
    }

    #[test]
    fn test_mad_ignores_outlier() {
        let values = [1.0, 2.0, 3.0, 4.0, 1000.0];
        let m = median(&values);
        assert!((mad(&values, m) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert!((percentile(&values, 50.0) - 20.0).abs() < 1e-12);
        assert!((percentile(&values, 10.0) - 4.0).abs() < 1e-12);
        assert!((percentile(&values, 100.0) - 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_cv_of_constant_is_zero() {
        assert!(coefficient_of_variation(&[0.01; 8]).unwrap().abs() < 1e-12);
        assert!(coefficient_of_variation(&[]).is_none());
    }

    #[test]
    fn test_union_merges_overlaps() {
        let total = union_length(&[(0.0, 1.0), (0.5, 2.0), (3.0, 4.0)]);
        assert!((total - 3.0).abs() < 1e-12);
        assert!(union_length(&[]).abs() < 1e-12);
    }
}
