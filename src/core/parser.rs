// wellmatrix - core/parser.rs
//
// Measurement extraction from per-object tables and free-text logs.
// Core layer: works on file content already read by the app layer and on
// lists of file paths; never touches the filesystem directly.

use crate::core::model::{MeasurementField, MeasurementRecord, ObjectMeasurements, RecordPayload};
use crate::util::constants;
use crate::util::error::{ExtractError, ParseError};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// =============================================================================
// Parameters
// =============================================================================

/// Row filters and schema for per-object measurement tables.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredParams {
    /// Rows are kept only if their Label contains this (case-insensitive).
    /// Also prefers files whose name contains it.
    pub dataset_label: Option<String>,

    /// Columns that must be present in the header.
    pub required_columns: Vec<MeasurementField>,

    /// Exclusive lower bound on Area.
    pub min_area: f64,

    /// Exclusive upper bound on Area.
    pub max_area: f64,

    /// Exclusive lower bound on circularity.
    pub min_circ: f64,
}

impl Default for StructuredParams {
    fn default() -> Self {
        Self {
            dataset_label: None,
            required_columns: MeasurementField::all().to_vec(),
            min_area: constants::DEFAULT_MIN_AREA,
            max_area: constants::DEFAULT_MAX_AREA,
            min_circ: constants::DEFAULT_MIN_CIRC,
        }
    }
}

/// Marker search for free-text logs.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeTextParams {
    /// Substring a filename must contain (case-insensitive).
    pub channel_id: String,

    /// Substring identifying a value line (case-insensitive).
    pub marker: String,
}

/// Extraction mode together with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionSpec {
    Structured(StructuredParams),
    FreeText(FreeTextParams),
}

/// Records and non-fatal errors from one file.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<MeasurementRecord>,
    pub errors: Vec<ParseError>,
}

impl Extraction {
    fn push_error(&mut self, error: ParseError) {
        if self.errors.len() < constants::MAX_PARSE_ERRORS_PER_FILE {
            self.errors.push(error);
        }
    }
}

// =============================================================================
// File selection
// =============================================================================

/// Pick the files of one leaf folder to extract.
///
/// `files` must already be in listing order. Every candidate must match
/// `pattern` by filename. Free-text mode then keeps every file whose name
/// contains the channel ID. Structured mode picks a single file: the first
/// whose name contains the dataset label, else the first candidate.
pub fn select_files(files: &[PathBuf], pattern: &glob::Pattern, spec: &ExtractionSpec) -> Vec<PathBuf> {
    let candidates: Vec<&PathBuf> = files
        .iter()
        .filter(|f| file_name(f).is_some_and(|n| pattern.matches(n)))
        .collect();

    match spec {
        ExtractionSpec::FreeText(params) => {
            let id = params.channel_id.to_lowercase();
            candidates
                .into_iter()
                .filter(|f| file_name(f).is_some_and(|n| n.to_lowercase().contains(&id)))
                .cloned()
                .collect()
        }
        ExtractionSpec::Structured(params) => {
            let labelled = params.dataset_label.as_ref().and_then(|label| {
                let label = label.to_lowercase();
                candidates
                    .iter()
                    .find(|f| file_name(f).is_some_and(|n| n.to_lowercase().contains(&label)))
            });
            labelled
                .or_else(|| candidates.first())
                .map(|f| vec![(*f).clone()])
                .unwrap_or_default()
        }
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

// =============================================================================
// Table / line parsing
// =============================================================================

/// One delimited row with its 1-based source line number.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub line_number: u64,
    pub cells: Vec<String>,
}

/// Outcome of reading a file that may or may not be a delimited table.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedFile {
    /// At least one row split into two or more cells.
    StructuredTable(Vec<TableRow>),
    /// Plain lines; the table read failed or found no multi-column row.
    RawLines(Vec<String>),
}

/// Tab when the first non-empty line contains one, otherwise comma.
pub fn sniff_delimiter(content: &str) -> u8 {
    let first = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if first.contains('\t') {
        b'\t'
    } else {
        b','
    }
}

/// Read `content` as a headerless delimited table, falling back to plain
/// lines when that fails.
pub fn parse_table_or_lines(content: &str) -> ParsedFile {
    match read_rows(content) {
        Some(rows) if rows.iter().any(|r| r.cells.len() >= 2) => ParsedFile::StructuredTable(rows),
        _ => ParsedFile::RawLines(content.lines().map(str::to_string).collect()),
    }
}

fn read_rows(content: &str) -> Option<Vec<TableRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .delimiter(sniff_delimiter(content))
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(r) => rows.push(TableRow {
                line_number: r.position().map(|p| p.line()).unwrap_or(0),
                cells: r.iter().map(str::to_string).collect(),
            }),
            Err(e) => {
                tracing::trace!(error = %e, "Table read failed; falling back to lines");
                return None;
            }
        }
    }
    Some(rows)
}

/// Signed decimal or scientific-notation number.
fn float_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?")
            .expect("float pattern is valid")
    })
}

/// The last number appearing in `text`, if any.
pub fn last_number(text: &str) -> Option<f64> {
    float_regex()
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .last()
}

// =============================================================================
// Extraction
// =============================================================================

/// Extract `content` according to `spec`.
pub fn extract_file(content: &str, path: &Path, spec: &ExtractionSpec) -> Result<Extraction, ExtractError> {
    match spec {
        ExtractionSpec::Structured(params) => extract_structured(content, path, params),
        ExtractionSpec::FreeText(params) => Ok(extract_free_text(content, path, params)),
    }
}

/// Extract every marker value from a free-text log, in file order.
///
/// For a table-parsed row the cell after the one holding the marker is
/// used when it is numeric; otherwise the last number in the line is taken.
/// Lines with no number yield a `ParseError` and no value.
pub fn extract_free_text(content: &str, path: &Path, params: &FreeTextParams) -> Extraction {
    let marker = params.marker.to_lowercase();
    let mut extraction = Extraction::default();
    let mut values: Vec<f64> = Vec::new();

    let mut handle_line = |line_number: u64, text: &str, adjacent: Option<f64>, out: &mut Extraction| {
        match adjacent.or_else(|| last_number(text)) {
            Some(v) => values.push(v),
            None => {
                tracing::debug!(file = %path.display(), line_number, "Marker line without a number");
                out.push_error(ParseError::NoNumericValue {
                    file: path.to_path_buf(),
                    line_number,
                    line: preview(text),
                });
            }
        }
    };

    // Markers are tested on each source line; the table row of the same
    // line only supplies the adjacent cell.
    let parsed = parse_table_or_lines(content);
    let rows: HashMap<u64, &TableRow> = match &parsed {
        ParsedFile::StructuredTable(rows) => rows.iter().map(|r| (r.line_number, r)).collect(),
        ParsedFile::RawLines(_) => HashMap::new(),
    };

    for (idx, line) in content.lines().enumerate() {
        if !line.to_lowercase().contains(&marker) {
            continue;
        }
        let line_number = idx as u64 + 1;
        let adjacent = rows
            .get(&line_number)
            .and_then(|row| adjacent_value(row, &marker));
        handle_line(line_number, line, adjacent, &mut extraction);
    }

    tracing::debug!(
        file = %path.display(),
        values = values.len(),
        errors = extraction.errors.len(),
        "Free-text extraction complete"
    );

    if !values.is_empty() {
        extraction.records.push(MeasurementRecord {
            source: path.to_path_buf(),
            payload: RecordPayload::FreeText(values),
        });
    }
    extraction
}

/// Extract one record per object row that passes the label, area, and
/// circularity filters.
///
/// Fails with `ExtractError::Schema` when any required column (or `Label`,
/// if a dataset label is configured) is missing; no partial result is
/// returned in that case.
pub fn extract_structured(
    content: &str,
    path: &Path,
    params: &StructuredParams,
) -> Result<Extraction, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(sniff_delimiter(content))
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ExtractError::Csv {
            file: path.to_path_buf(),
            source: e,
        })?
        .clone();

    let mut columns: HashMap<MeasurementField, usize> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(field) = MeasurementField::from_header(header) {
            columns.entry(field).or_insert(idx);
        }
    }

    let mut required = params.required_columns.clone();
    if params.dataset_label.is_some() && !required.contains(&MeasurementField::Label) {
        required.push(MeasurementField::Label);
    }
    let missing: Vec<String> = required
        .iter()
        .filter(|f| !columns.contains_key(f))
        .map(|f| f.label().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ExtractError::Schema {
            file: path.to_path_buf(),
            missing,
        });
    }

    let label_filter = params.dataset_label.as_ref().map(|l| l.to_lowercase());
    let mut extraction = Extraction::default();
    let mut rows_seen = 0usize;

    for record in reader.records() {
        let record = record.map_err(|e| ExtractError::Csv {
            file: path.to_path_buf(),
            source: e,
        })?;
        rows_seen += 1;
        let line_number = record.position().map(|p| p.line()).unwrap_or(0);

        let label = columns
            .get(&MeasurementField::Label)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
            .to_string();

        // Only a required column can reject a row; an unparsable optional
        // cell is recorded as absent.
        let mut numbers: HashMap<MeasurementField, f64> = HashMap::new();
        let mut bad_cell = false;
        for field in MeasurementField::all().iter().filter(|f| f.is_numeric()) {
            let Some(&idx) = columns.get(field) else {
                continue;
            };
            let raw = record.get(idx).unwrap_or("");
            match raw.parse::<f64>() {
                Ok(v) => {
                    numbers.insert(*field, v);
                }
                Err(_) if required.contains(field) => {
                    extraction.push_error(ParseError::InvalidNumber {
                        file: path.to_path_buf(),
                        line_number,
                        column: field.label().to_string(),
                        raw: preview(raw),
                    });
                    bad_cell = true;
                    break;
                }
                Err(_) => {
                    tracing::trace!(line_number, column = field.label(), "Optional cell not numeric");
                }
            }
        }
        if bad_cell {
            continue;
        }

        if let Some(ref wanted) = label_filter {
            if !label.to_lowercase().contains(wanted) {
                continue;
            }
        }
        // Comparisons are written so that a NaN area or circularity fails.
        let area_ok = numbers
            .get(&MeasurementField::Area)
            .map_or(true, |&a| params.min_area < a && a < params.max_area);
        let circ_ok = numbers
            .get(&MeasurementField::Circ)
            .map_or(true, |&c| c > params.min_circ);
        if !area_ok || !circ_ok {
            continue;
        }

        let get = |f: MeasurementField| numbers.get(&f).copied();
        extraction.records.push(MeasurementRecord {
            source: path.to_path_buf(),
            payload: RecordPayload::Structured(ObjectMeasurements {
                label,
                area: get(MeasurementField::Area),
                mean: get(MeasurementField::Mean),
                int_den: get(MeasurementField::IntDen),
                std_dev: get(MeasurementField::StdDev),
                max: get(MeasurementField::Max),
                circ: get(MeasurementField::Circ),
            }),
        });
    }

    tracing::debug!(
        file = %path.display(),
        rows = rows_seen,
        kept = extraction.records.len(),
        errors = extraction.errors.len(),
        "Structured extraction complete"
    );

    Ok(extraction)
}

/// Finite number in the cell after the one holding `marker`.
fn adjacent_value(row: &TableRow, marker: &str) -> Option<f64> {
    row.cells
        .iter()
        .position(|c| c.to_lowercase().contains(marker))
        .and_then(|i| row.cells.get(i + 1))
        .and_then(|c| c.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn preview(text: &str) -> String {
    text.chars().take(constants::MAX_LINE_PREVIEW).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = " ,Label,Area,Mean,IntDen,StdDev,Max,Circ.\n\
        1,DAPI:cell1,50,10.5,525,1.2,30,0.90\n\
        2,DAPI:cell2,5,11.0,55,1.0,20,0.95\n\
        3,GFP:cell3,60,12.0,720,2.0,40,0.80\n\
        4,dapi:cell4,70,13.0,910,2.5,45,0.20\n\
        5,DAPI:cell5,80,14.0,1120,3.0,50,0.85\n";

    fn structured(label: Option<&str>) -> StructuredParams {
        StructuredParams {
            dataset_label: label.map(str::to_string),
            min_area: 10.0,
            max_area: 1000.0,
            min_circ: 0.5,
            ..Default::default()
        }
    }

    fn means(extraction: &Extraction) -> Vec<f64> {
        extraction
            .records
            .iter()
            .flat_map(|r| r.scalars(MeasurementField::Mean))
            .collect()
    }

    fn pearson() -> FreeTextParams {
        FreeTextParams {
            channel_id: "C1".to_string(),
            marker: "Pearson's R value (no threshold)".to_string(),
        }
    }

    #[test]
    fn test_structured_row_filters() {
        let ex = extract_structured(TABLE, Path::new("r.csv"), &structured(Some("dapi"))).unwrap();
        // cell2 fails area, cell3 fails label, cell4 fails circularity
        assert_eq!(means(&ex), vec![10.5, 14.0]);
        assert!(ex.errors.is_empty());
    }

    #[test]
    fn test_structured_without_label_keeps_all_labels() {
        let ex = extract_structured(TABLE, Path::new("r.csv"), &structured(None)).unwrap();
        assert_eq!(means(&ex), vec![10.5, 12.0, 14.0]);
    }

    #[test]
    fn test_structured_fields_copied_verbatim() {
        let ex = extract_structured(TABLE, Path::new("r.csv"), &structured(Some("cell1"))).unwrap();
        match &ex.records[0].payload {
            RecordPayload::Structured(m) => {
                assert_eq!(m.label, "DAPI:cell1");
                assert_eq!(m.area, Some(50.0));
                assert_eq!(m.int_den, Some(525.0));
                assert_eq!(m.std_dev, Some(1.2));
                assert_eq!(m.max, Some(30.0));
                assert_eq!(m.circ, Some(0.90));
            }
            other => panic!("expected structured payload, got {other:?}"),
        }
    }

    #[test]
    fn test_structured_missing_column_is_schema_error() {
        let content = "Label,Area,Mean,StdDev,Max,Circ.\nDAPI:c,50,1,1,1,0.9\n";
        let err = extract_structured(content, Path::new("r.csv"), &structured(None)).unwrap_err();
        match err {
            ExtractError::Schema { missing, .. } => assert_eq!(missing, vec!["IntDen"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_structured_tab_delimited() {
        let content = "Label\tArea\tMean\tIntDen\tStdDev\tMax\tCirc_\nc1\t50\t7.5\t375\t1\t9\t0.9\n";
        let ex = extract_structured(content, Path::new("r.xls"), &structured(None)).unwrap();
        assert_eq!(means(&ex), vec![7.5]);
    }

    #[test]
    fn test_structured_bad_number_skips_row_with_warning() {
        let content = "Label,Area,Mean,IntDen,StdDev,Max,Circ\nc1,50,abc,1,1,1,0.9\nc2,50,3,1,1,1,0.9\n";
        let ex = extract_structured(content, Path::new("r.csv"), &structured(None)).unwrap();
        assert_eq!(means(&ex), vec![3.0]);
        assert!(matches!(
            ex.errors[0],
            ParseError::InvalidNumber { line_number: 2, .. }
        ));
    }

    #[test]
    fn test_structured_optional_column_cannot_reject_row() {
        let content = "Label,Area,Mean,IntDen,StdDev,Max,Circ\nc1,50,3,1,1,,0.9\nc2,60,4,x,1,2,0.9\n";
        let params = StructuredParams {
            required_columns: vec![
                MeasurementField::Label,
                MeasurementField::Area,
                MeasurementField::Mean,
            ],
            ..Default::default()
        };
        let ex = extract_structured(content, Path::new("r.csv"), &params).unwrap();
        assert_eq!(means(&ex), vec![3.0, 4.0]);
        assert!(ex.errors.is_empty());
        match &ex.records[0].payload {
            RecordPayload::Structured(m) => assert_eq!(m.max, None),
            other => panic!("expected structured payload, got {other:?}"),
        }
        match &ex.records[1].payload {
            RecordPayload::Structured(m) => assert_eq!(m.int_den, None),
            other => panic!("expected structured payload, got {other:?}"),
        }
    }

    #[test]
    fn test_structured_absent_column_is_none() {
        let content = "Label,Area\nc1,50\n";
        let params = StructuredParams {
            required_columns: vec![MeasurementField::Label, MeasurementField::Area],
            ..Default::default()
        };
        let ex = extract_structured(content, Path::new("r.csv"), &params).unwrap();
        assert_eq!(ex.records.len(), 1);
        assert!(means(&ex).is_empty());
    }

    #[test]
    fn test_free_text_pearson_line() {
        let content = "Coloc_2 version 3.0.0\n\
            Pearson's R value (no threshold) 0.8423\n\
            Pearson's R value (below threshold) 0.12\n";
        let ex = extract_free_text(content, Path::new("C1_log.txt"), &pearson());
        assert_eq!(ex.records.len(), 1);
        assert_eq!(ex.records[0].scalars(MeasurementField::Mean), vec![0.8423]);
    }

    #[test]
    fn test_free_text_uses_adjacent_table_cell() {
        let content = "Name\tValue\tNote\n\
            Pearson's R value (no threshold)\t0.61\t3 channels\n\
            Li's ICQ value\t0.2\t\n";
        let ex = extract_free_text(content, Path::new("log.txt"), &pearson());
        assert_eq!(ex.records[0].scalars(MeasurementField::Mean), vec![0.61]);
    }

    #[test]
    fn test_free_text_multiple_matches_in_file_order() {
        let content = "pearson's r value (no threshold) = -1.5e-2\n\
            other 3\n\
            PEARSON'S R VALUE (NO THRESHOLD) +0.75\n";
        let ex = extract_free_text(content, Path::new("log.txt"), &pearson());
        assert_eq!(ex.records[0].scalars(MeasurementField::Mean), vec![-0.015, 0.75]);
    }

    #[test]
    fn test_free_text_line_without_number_is_non_fatal() {
        let content = "Pearson's R value (no threshold) NaN?\nPearson's R value (no threshold) 0.3\n";
        let ex = extract_free_text(content, Path::new("log.txt"), &pearson());
        assert_eq!(ex.records[0].scalars(MeasurementField::Mean), vec![0.3]);
        assert_eq!(ex.errors.len(), 1);
        assert!(matches!(
            ex.errors[0],
            ParseError::NoNumericValue { line_number: 1, .. }
        ));
    }

    #[test]
    fn test_free_text_unclosed_quote_stays_on_its_line() {
        let content = "Settings,\"C1 image\n\
            Pearson's R value (no threshold) 0.5\n\
            other 9\n";
        let ex = extract_free_text(content, Path::new("C1_log.txt"), &pearson());
        assert_eq!(ex.records[0].scalars(MeasurementField::Mean), vec![0.5]);
    }

    #[test]
    fn test_free_text_non_finite_adjacent_cell_is_not_a_value() {
        let content = "Name\tValue\nPearson's R value (no threshold)\tNaN\n";
        let ex = extract_free_text(content, Path::new("log.txt"), &pearson());
        assert!(ex.records.is_empty());
        assert!(matches!(
            ex.errors[0],
            ParseError::NoNumericValue { line_number: 2, .. }
        ));

        let content = "Name\tValue\tNote\nPearson's R value (no threshold)\tinf\t0.4\n";
        let ex = extract_free_text(content, Path::new("log.txt"), &pearson());
        assert_eq!(ex.records[0].scalars(MeasurementField::Mean), vec![0.4]);
    }

    #[test]
    fn test_free_text_marker_spanning_delimiter() {
        let params = FreeTextParams {
            channel_id: "C1".to_string(),
            marker: "R value, no threshold".to_string(),
        };
        let content = "Name,Value\nR value, no threshold, 0.7\nR value, above threshold, 0.2\n";
        let ex = extract_free_text(content, Path::new("log.txt"), &params);
        assert_eq!(ex.records[0].scalars(MeasurementField::Mean), vec![0.7]);
    }

    #[test]
    fn test_free_text_no_match_yields_no_record() {
        let ex = extract_free_text("nothing here 1.0\n", Path::new("log.txt"), &pearson());
        assert!(ex.records.is_empty());
        assert!(ex.errors.is_empty());
    }

    #[test]
    fn test_parse_table_or_lines_dispatch() {
        assert!(matches!(
            parse_table_or_lines("a,b\n1,2\n"),
            ParsedFile::StructuredTable(_)
        ));
        assert!(matches!(
            parse_table_or_lines("just text\nmore text\n"),
            ParsedFile::RawLines(_)
        ));
    }

    #[test]
    fn test_last_number() {
        assert_eq!(last_number("R 1 then 2.5e3"), Some(2500.0));
        assert_eq!(last_number("value -.5"), Some(-0.5));
        assert_eq!(last_number("no digits"), None);
    }

    #[test]
    fn test_select_files_structured_prefers_label() {
        let files = vec![
            PathBuf::from("leaf/Results_GFP.csv"),
            PathBuf::from("leaf/Results_DAPI.csv"),
            PathBuf::from("leaf/notes.txt"),
        ];
        let pattern = glob::Pattern::new("*.csv").unwrap();
        let spec = ExtractionSpec::Structured(structured(Some("dapi")));
        assert_eq!(
            select_files(&files, &pattern, &spec),
            vec![PathBuf::from("leaf/Results_DAPI.csv")]
        );

        let spec = ExtractionSpec::Structured(structured(Some("mcherry")));
        assert_eq!(
            select_files(&files, &pattern, &spec),
            vec![PathBuf::from("leaf/Results_GFP.csv")]
        );
    }

    #[test]
    fn test_select_files_free_text_filters_channel() {
        let files = vec![
            PathBuf::from("leaf/c1_log.txt"),
            PathBuf::from("leaf/C2_log.txt"),
            PathBuf::from("leaf/C1_summary.txt"),
            PathBuf::from("leaf/C1_image.tif"),
        ];
        let pattern = glob::Pattern::new("*.txt").unwrap();
        let spec = ExtractionSpec::FreeText(pearson());
        assert_eq!(
            select_files(&files, &pattern, &spec),
            vec![
                PathBuf::from("leaf/c1_log.txt"),
                PathBuf::from("leaf/C1_summary.txt")
            ]
        );
    }

    #[test]
    fn test_select_files_nothing_matches_glob() {
        let files = vec![PathBuf::from("leaf/a.tif")];
        let pattern = glob::Pattern::new("*.csv").unwrap();
        let spec = ExtractionSpec::Structured(StructuredParams::default());
        assert!(select_files(&files, &pattern, &spec).is_empty());
    }
}
