// wellmatrix - core/postprocess.rs
//
// Optional per-column outlier trimming and min-max rescaling.
// Each column is treated independently using only its own non-NaN values.

use crate::core::matrix::AggregationMatrix;
use crate::util::constants;

/// Which transforms to apply. Both are off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostProcessConfig {
    pub remove_outliers: bool,
    pub rescale: bool,
}

/// Apply the enabled transforms to every column: outlier trim first,
/// then rescale.
pub fn apply(matrix: &mut AggregationMatrix, config: &PostProcessConfig) {
    if !config.remove_outliers && !config.rescale {
        return;
    }
    for column in matrix.columns_mut() {
        if config.remove_outliers {
            remove_outliers(column);
        }
        if config.rescale {
            rescale(column);
        }
    }
    tracing::debug!(
        remove_outliers = config.remove_outliers,
        rescale = config.rescale,
        "Post-processing applied"
    );
}

/// Replace values outside the column's [10th, 90th] percentile window
/// with NaN. Returns the number of values removed.
pub fn remove_outliers(column: &mut [f64]) -> usize {
    let mut finite: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
    if finite.is_empty() {
        return 0;
    }
    finite.sort_by(f64::total_cmp);

    let low = percentile_sorted(&finite, constants::OUTLIER_LOWER_PERCENTILE);
    let high = percentile_sorted(&finite, constants::OUTLIER_UPPER_PERCENTILE);

    let mut removed = 0;
    for v in column.iter_mut() {
        if !v.is_nan() && (*v < low || *v > high) {
            *v = f64::NAN;
            removed += 1;
        }
    }
    removed
}

/// Linearly map non-NaN values onto [0, 1] using the column's own min and
/// max. All-NaN and zero-range columns are left unchanged.
pub fn rescale(column: &mut [f64]) {
    let (min, max) = column
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return;
    }
    for v in column.iter_mut().filter(|v| !v.is_nan()) {
        *v = (*v - min) / range;
    }
}

/// Percentile `p` (0-100) of ascending `sorted` by linear interpolation
/// between closest ranks. `sorted` must be non-empty.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
