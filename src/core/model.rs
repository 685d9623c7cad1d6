// wellmatrix - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// =============================================================================
// Discovery
// =============================================================================

/// A folder found by the directory scanner together with its depth below
/// the scan root (1 = group, 2 = subfolder, 3 = leaf).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNode {
    pub path: PathBuf,
    pub depth: usize,
}

impl PathNode {
    /// Final path component, or an empty string for non-UTF-8 names.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// A folder-name selector as supplied by configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SelectorSpec {
    /// Case-insensitive regular expression. Empty matches every name.
    pub pattern: String,

    /// When true the match must start at offset 0 of the name.
    pub strict: bool,
}

impl SelectorSpec {
    pub fn new(pattern: impl Into<String>, strict: bool) -> Self {
        Self {
            pattern: pattern.into(),
            strict,
        }
    }
}

// =============================================================================
// Groups
// =============================================================================

/// A top-level condition/well folder and the leaf folders it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// Basename of the group root; used as the matrix column header.
    pub name: String,

    /// Group root folder.
    pub root: PathBuf,

    /// Leaf folders in scan order.
    pub leaves: Vec<PathBuf>,
}

// =============================================================================
// Measurements
// =============================================================================

/// How the files of a run are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Per-object measurement tables (one record per segmented object).
    Structured,
    /// Free-text logs with a marker line followed by a value.
    FreeText,
}

impl ExtractionMode {
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionMode::Structured => "structured",
            ExtractionMode::FreeText => "free_text",
        }
    }
}

/// Columns of a per-object measurement table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementField {
    Label,
    Area,
    Mean,
    IntDen,
    StdDev,
    Max,
    Circ,
}

impl MeasurementField {
    /// All columns, in canonical table order.
    pub fn all() -> &'static [MeasurementField] {
        &[
            MeasurementField::Label,
            MeasurementField::Area,
            MeasurementField::Mean,
            MeasurementField::IntDen,
            MeasurementField::StdDev,
            MeasurementField::Max,
            MeasurementField::Circ,
        ]
    }

    /// Canonical header name.
    pub fn label(&self) -> &'static str {
        match self {
            MeasurementField::Label => "Label",
            MeasurementField::Area => "Area",
            MeasurementField::Mean => "Mean",
            MeasurementField::IntDen => "IntDen",
            MeasurementField::StdDev => "StdDev",
            MeasurementField::Max => "Max",
            MeasurementField::Circ => "Circ",
        }
    }

    /// Resolve a header cell (or config value) to a field.
    ///
    /// Matching is case-insensitive and accepts the spellings measurement
    /// tables are known to use (`Circ.`, `Circ_`, `IntegratedDensity`, ...).
    pub fn from_header(raw: &str) -> Option<MeasurementField> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "label" => Some(MeasurementField::Label),
            "area" => Some(MeasurementField::Area),
            "mean" => Some(MeasurementField::Mean),
            "intden" | "integrateddensity" => Some(MeasurementField::IntDen),
            "stddev" => Some(MeasurementField::StdDev),
            "max" => Some(MeasurementField::Max),
            "circ" | "circularity" => Some(MeasurementField::Circ),
            _ => None,
        }
    }

    /// True for every column except `Label`.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, MeasurementField::Label)
    }
}

impl std::fmt::Display for MeasurementField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Numeric fields of one segmented object, copied verbatim from its row.
///
/// `None` marks a column absent from the table, or an optional column
/// whose cell was blank or not a number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectMeasurements {
    pub label: String,
    pub area: Option<f64>,
    pub mean: Option<f64>,
    pub int_den: Option<f64>,
    pub std_dev: Option<f64>,
    pub max: Option<f64>,
    pub circ: Option<f64>,
}

impl ObjectMeasurements {
    /// Value of a numeric field. `Label` has no numeric value.
    pub fn get(&self, field: MeasurementField) -> Option<f64> {
        match field {
            MeasurementField::Label => None,
            MeasurementField::Area => self.area,
            MeasurementField::Mean => self.mean,
            MeasurementField::IntDen => self.int_den,
            MeasurementField::StdDev => self.std_dev,
            MeasurementField::Max => self.max,
            MeasurementField::Circ => self.circ,
        }
    }
}

/// What a single file contributed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RecordPayload {
    Structured(ObjectMeasurements),
    FreeText(Vec<f64>),
}

/// One extraction result, tied to the file it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRecord {
    pub source: PathBuf,
    pub payload: RecordPayload,
}

impl MeasurementRecord {
    /// Scalars this record feeds into the matrix. Structured records yield
    /// the selected field; free-text records yield all their values.
    pub fn scalars(&self, field: MeasurementField) -> Vec<f64> {
        match &self.payload {
            RecordPayload::Structured(m) => m.get(field).into_iter().collect(),
            RecordPayload::FreeText(values) => values.clone(),
        }
    }
}

/// Everything extracted for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResult {
    pub group: Group,

    /// Records in leaf order, then file order within a leaf.
    pub records: Vec<MeasurementRecord>,

    /// Raw scalars fed to the matrix column, before zero canonicalisation.
    pub values: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_aliases_resolve() {
        assert_eq!(
            MeasurementField::from_header("Circ."),
            Some(MeasurementField::Circ)
        );
        assert_eq!(
            MeasurementField::from_header("Circ_"),
            Some(MeasurementField::Circ)
        );
        assert_eq!(
            MeasurementField::from_header(" intden "),
            Some(MeasurementField::IntDen)
        );
        assert_eq!(
            MeasurementField::from_header("IntegratedDensity"),
            Some(MeasurementField::IntDen)
        );
        assert_eq!(MeasurementField::from_header("Feret"), None);
        assert_eq!(MeasurementField::from_header(" "), None);
    }

    #[test]
    fn test_scalars_per_payload() {
        let structured = MeasurementRecord {
            source: PathBuf::from("a.csv"),
            payload: RecordPayload::Structured(ObjectMeasurements {
                label: "cell".to_string(),
                area: Some(10.0),
                mean: Some(42.5),
                int_den: Some(425.0),
                std_dev: Some(1.0),
                max: Some(99.0),
                circ: None,
            }),
        };
        assert_eq!(structured.scalars(MeasurementField::Mean), vec![42.5]);
        assert!(structured.scalars(MeasurementField::Label).is_empty());
        // An absent column contributes nothing rather than a NaN.
        assert!(structured.scalars(MeasurementField::Circ).is_empty());

        let free = MeasurementRecord {
            source: PathBuf::from("log.txt"),
            payload: RecordPayload::FreeText(vec![0.1, 0.2]),
        };
        assert_eq!(free.scalars(MeasurementField::Mean), vec![0.1, 0.2]);
    }

    #[test]
    fn test_path_node_name() {
        let node = PathNode {
            path: PathBuf::from("root").join("res_Cond1"),
            depth: 1,
        };
        assert_eq!(node.name(), "res_Cond1");
    }
}
