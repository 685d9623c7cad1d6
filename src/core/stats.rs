// wellmatrix - core/stats.rs
//
// Descriptive statistics per matrix column, ignoring NaN cells.

use crate::core::matrix::AggregationMatrix;
use crate::core::postprocess::percentile_sorted;
use serde::Serialize;

/// Summary of one group column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub group: String,
    /// Number of non-NaN cells.
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1). NaN when n < 2.
    pub std_dev: f64,
    /// Standard error of the mean. NaN when n < 2.
    pub sem: f64,
    pub min: f64,
    pub max: f64,
}

/// Summarise `column`. An empty or all-NaN column gives `n = 0` and NaN
/// statistics.
pub fn summarize_column(group: &str, column: &[f64]) -> ColumnSummary {
    let mut values: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
    values.sort_by(f64::total_cmp);
    let n = values.len();

    if n == 0 {
        return ColumnSummary {
            group: group.to_string(),
            n,
            mean: f64::NAN,
            median: f64::NAN,
            std_dev: f64::NAN,
            sem: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
        };
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let (std_dev, sem) = if n > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let sd = var.sqrt();
        (sd, sd / (n as f64).sqrt())
    } else {
        (f64::NAN, f64::NAN)
    };

    ColumnSummary {
        group: group.to_string(),
        n,
        mean,
        median: percentile_sorted(&values, 50.0),
        std_dev,
        sem,
        min: values[0],
        max: values[n - 1],
    }
}

/// One summary per matrix column, in column order.
pub fn summarize(matrix: &AggregationMatrix) -> Vec<ColumnSummary> {
    matrix
        .group_names()
        .iter()
        .zip(matrix.columns())
        .map(|(name, column)| summarize_column(name, column))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_ignores_nan() {
        let s = summarize_column("A", &[2.0, f64::NAN, 4.0, 6.0]);
        assert_eq!(s.n, 3);
        assert_eq!(s.mean, 4.0);
        assert_eq!(s.median, 4.0);
        assert_eq!(s.std_dev, 2.0);
        assert!((s.sem - 2.0 / 3f64.sqrt()).abs() < 1e-12);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 6.0);
    }

    #[test]
    fn test_summary_of_empty_column() {
        let s = summarize_column("empty", &[f64::NAN]);
        assert_eq!(s.n, 0);
        assert!(s.mean.is_nan() && s.median.is_nan());
    }

    #[test]
    fn test_single_value_has_no_spread() {
        let s = summarize_column("one", &[5.0]);
        assert_eq!(s.mean, 5.0);
        assert!(s.std_dev.is_nan());
    }

    #[test]
    fn test_summarize_follows_column_order() {
        let m = AggregationMatrix::build(&[
            ("A".to_string(), vec![1.0, 3.0]),
            ("B".to_string(), vec![10.0]),
        ])
        .unwrap();
        let summaries = summarize(&m);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].group, "A");
        assert_eq!(summaries[0].mean, 2.0);
        assert_eq!(summaries[1].n, 1);
    }
}
