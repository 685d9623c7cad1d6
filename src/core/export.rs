// wellmatrix - core/export.rs
//
// CSV export of the aggregation matrix and JSON export of the run report.
// Core layer: writes to any Write trait object.

use crate::core::matrix::AggregationMatrix;
use crate::core::model::GroupResult;
use crate::core::stats::ColumnSummary;
use crate::util::constants;
use crate::util::error::ExportError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Export the matrix as CSV: a header of group names, then one row per
/// observation. Missing cells are written as `NaN`.
///
/// Returns the number of data rows written.
pub fn export_matrix_csv<W: Write>(
    matrix: &AggregationMatrix,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_err = |e| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(matrix.group_names())
        .map_err(csv_err)?;

    for row in 0..matrix.rows() {
        let cells: Vec<String> = (0..matrix.cols())
            .map(|col| match matrix.get(row, col) {
                Some(v) if !v.is_nan() => v.to_string(),
                _ => constants::NAN_CELL.to_string(),
            })
            .collect();
        csv_writer.write_record(&cells).map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(matrix.rows())
}

/// Serialisable summary of a run, handed to presentation tools.
///
/// NaN cells serialise as JSON `null`.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub app_version: &'static str,
    pub root: &'a Path,
    pub mode: &'static str,
    pub matrix: &'a AggregationMatrix,
    pub summaries: &'a [ColumnSummary],
    pub groups: &'a [GroupResult],
    pub orphans: &'a [PathBuf],
    pub warnings: &'a [String],
}

/// Export the run report as pretty-printed JSON.
pub fn export_report_json<W: Write>(
    report: &RunReport<'_>,
    writer: W,
    export_path: &Path,
) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, report).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })
}
