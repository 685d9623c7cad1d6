// wellmatrix - app/run.rs
//
// Aggregation run orchestration: discovery → selection → grouping →
// extraction → matrix assembly → post-processing → summaries.
//
// Single-threaded and synchronous. Non-fatal problems (unreadable entries,
// orphan leaves, skipped folders, per-line parse failures) are collected as
// warnings. Fatal problems return `Err` and no partial matrix.

use crate::core::discovery;
use crate::core::grouping;
use crate::core::matrix::AggregationMatrix;
use crate::core::model::{GroupResult, MeasurementRecord, PathNode};
use crate::core::parser;
use crate::core::postprocess;
use crate::core::selector::CompiledSelector;
use crate::core::stats::{self, ColumnSummary};
use crate::platform::config::RunConfig;
use crate::platform::fs;
use crate::util::constants;
use crate::util::error::{EmptyResultError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Everything a run produces, handed to export / presentation.
#[derive(Debug)]
pub struct AggregationOutput {
    /// Observations x groups, post-processed when configured.
    pub matrix: AggregationMatrix,

    /// Per-group leaves, records, and raw values, in column order.
    pub groups: Vec<GroupResult>,

    /// Per-column statistics of the final matrix.
    pub summaries: Vec<ColumnSummary>,

    /// Selected leaves that belong to no selected group.
    pub orphans: Vec<PathBuf>,

    /// Non-fatal problems, capped at `MAX_WARNINGS`.
    pub warnings: Vec<String>,
}

/// Bounded warning collector.
#[derive(Debug, Default)]
struct Warnings {
    messages: Vec<String>,
    suppressed: usize,
}

impl Warnings {
    fn push(&mut self, message: String) {
        if self.messages.len() < constants::MAX_WARNINGS {
            self.messages.push(message);
        } else {
            self.suppressed += 1;
        }
    }

    fn extend(&mut self, messages: impl IntoIterator<Item = String>) {
        for m in messages {
            self.push(m);
        }
    }

    fn finish(mut self) -> Vec<String> {
        if self.suppressed > 0 {
            self.messages
                .push(format!("{} further warning(s) suppressed", self.suppressed));
        }
        self.messages
    }
}

/// Run one aggregation with `config`.
pub fn run_aggregation(config: &RunConfig) -> Result<AggregationOutput> {
    let mut warnings = Warnings::default();

    tracing::info!(
        root = %config.root.display(),
        mode = config.mode.label(),
        pattern = config.file_pattern.as_str(),
        "Aggregation starting"
    );

    // -------------------------------------------------------------------------
    // Phase 1: Discovery and per-level selection
    // -------------------------------------------------------------------------
    let groups = select_level(
        &config.root,
        constants::GROUP_DEPTH,
        &config.folder_selector,
        &mut warnings,
    )?;
    if groups.is_empty() {
        return Err(EmptyResultError::NoGroups {
            root: config.root.clone(),
        }
        .into());
    }

    let subfolders: HashSet<PathBuf> = select_level(
        &config.root,
        constants::SUBFOLDER_DEPTH,
        &config.subfolder_selector,
        &mut warnings,
    )?
    .into_iter()
    .collect();

    let leaves: Vec<PathBuf> = select_level(
        &config.root,
        constants::LEAF_DEPTH,
        &config.file_selector,
        &mut warnings,
    )?
    .into_iter()
    .filter(|leaf| {
        let keep = leaf.parent().is_some_and(|p| subfolders.contains(p));
        if !keep {
            tracing::debug!(leaf = %leaf.display(), "Leaf under an unselected subfolder");
        }
        keep
    })
    .collect();

    // -------------------------------------------------------------------------
    // Phase 2: Grouping
    // -------------------------------------------------------------------------
    let grouping = grouping::group_leaves(&groups, &leaves);
    warnings.extend(grouping.orphans.iter().map(|o| {
        format!(
            "'{}': leaf folder belongs to no selected group, excluded",
            o.display()
        )
    }));

    // -------------------------------------------------------------------------
    // Phase 3: Extraction
    // -------------------------------------------------------------------------
    let mut results: Vec<GroupResult> = Vec::with_capacity(grouping.groups.len());
    for group in grouping.groups {
        let mut records: Vec<MeasurementRecord> = Vec::new();
        for leaf in &group.leaves {
            records.extend(extract_leaf(leaf, config, &mut warnings)?);
        }
        let values: Vec<f64> = records
            .iter()
            .flat_map(|r| r.scalars(config.measurement))
            .collect();

        tracing::info!(
            group = %group.name,
            leaves = group.leaves.len(),
            records = records.len(),
            values = values.len(),
            "Group extracted"
        );

        results.push(GroupResult {
            group,
            records,
            values,
        });
    }

    // -------------------------------------------------------------------------
    // Phase 4: Matrix and post-processing
    // -------------------------------------------------------------------------
    let group_values: Vec<(String, Vec<f64>)> = results
        .iter()
        .map(|r| (r.group.name.clone(), r.values.clone()))
        .collect();
    let mut matrix = AggregationMatrix::build(&group_values)?;
    postprocess::apply(&mut matrix, &config.postprocess);
    let summaries = stats::summarize(&matrix);

    for s in &summaries {
        tracing::info!(
            group = %s.group,
            n = s.n,
            mean = s.mean,
            sem = s.sem,
            "Column summary"
        );
    }

    let warnings = warnings.finish();
    tracing::info!(
        rows = matrix.rows(),
        cols = matrix.cols(),
        orphans = grouping.orphans.len(),
        warnings = warnings.len(),
        "Aggregation complete"
    );

    Ok(AggregationOutput {
        matrix,
        groups: results,
        summaries,
        orphans: grouping.orphans,
        warnings,
    })
}

/// Scan one hierarchy level and keep the folders whose basename the
/// selector accepts, in scan order.
fn select_level(
    root: &Path,
    depth: usize,
    selector: &CompiledSelector,
    warnings: &mut Warnings,
) -> Result<Vec<PathBuf>> {
    let (nodes, scan_warnings) = discovery::scan(root, depth)?;
    warnings.extend(scan_warnings);

    let found = nodes.len();
    let names: Vec<&str> = nodes.iter().map(PathNode::name).collect();
    let mask = selector.mask(&names);
    let selected: Vec<PathBuf> = nodes
        .into_iter()
        .zip(mask)
        .filter_map(|(node, keep)| keep.then_some(node.path))
        .collect();

    tracing::debug!(depth, found, selected = selected.len(), "Level selected");
    Ok(selected)
}

/// Extract every selected file of one leaf folder.
///
/// Unreadable folders and files degrade to warnings. An empty folder is a
/// warning or an error depending on `ignore_empty_folders`. Schema errors
/// are returned.
fn extract_leaf(
    leaf: &Path,
    config: &RunConfig,
    warnings: &mut Warnings,
) -> Result<Vec<MeasurementRecord>> {
    let listing = match fs::list_files(leaf) {
        Ok(files) => files,
        Err(e) => {
            let msg = format!("Cannot list '{}': {e}", leaf.display());
            tracing::warn!(warning = %msg, "Leaf listing failed");
            warnings.push(msg);
            Vec::new()
        }
    };

    let selected = parser::select_files(&listing, &config.file_pattern, &config.extraction);
    if selected.is_empty() {
        if !config.ignore_empty_folders {
            return Err(EmptyResultError::EmptyFolder {
                folder: leaf.to_path_buf(),
                pattern: config.file_pattern.as_str().to_string(),
            }
            .into());
        }
        let msg = format!(
            "'{}': no file matching '{}', folder skipped",
            leaf.display(),
            config.file_pattern.as_str()
        );
        tracing::warn!(warning = %msg, "Empty leaf folder");
        warnings.push(msg);
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for file in &selected {
        let content = match fs::read_file_lossy(file) {
            Ok(c) => c,
            Err(e) => {
                let msg = format!("Cannot read '{}': {e}", file.display());
                tracing::warn!(warning = %msg, "File read failed");
                warnings.push(msg);
                continue;
            }
        };

        let extraction = parser::extract_file(&content, file, &config.extraction)?;
        for err in &extraction.errors {
            tracing::debug!(error = %err, "Parse error");
        }
        warnings.extend(extraction.errors.iter().map(ToString::to_string));
        records.extend(extraction.records);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::config::parse_raw_config;
    use crate::util::error::WellMatrixError;
    use std::fs as stdfs;

    fn write_log(root: &Path, leaf: &str, name: &str, value: &str) {
        let dir = root.join(leaf);
        stdfs::create_dir_all(&dir).unwrap();
        stdfs::write(
            dir.join(name),
            format!("Coloc_2 results\nPearson's R value (no threshold) {value}\n"),
        )
        .unwrap();
    }

    fn config(root: &Path, extra: &str, ignore_empty: bool) -> RunConfig {
        let content = format!(
            r#"
[scan]
root = "{}"
folder_selector = "res"
strict_selector = true
ignore_empty_folders = {ignore_empty}

[extraction]
mode = "free_text"
file_pattern = "*.txt"
label = "C1"
marker = "Pearson's R value (no threshold)"
{extra}
"#,
            root.display().to_string().replace('\\', "/")
        );
        parse_raw_config(&content, Path::new("test.toml"))
            .unwrap()
            .validate()
            .unwrap()
    }

    #[test]
    fn test_two_group_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_log(root, "res_A/s1/cell1", "C1_log.txt", "0.5");
        write_log(root, "res_A/s1/cell2", "C1_log.txt", "0.7");
        write_log(root, "res_B/s1/cell1", "C1_log.txt", "0.9");
        write_log(root, "ctrl/s1/cell1", "C1_log.txt", "0.1");

        let out = run_aggregation(&config(root, "", false)).unwrap();
        assert_eq!(out.matrix.group_names(), ["res_A".to_string(), "res_B".to_string()]);
        assert_eq!(out.matrix.row(0), Some(vec![0.5, 0.9]));
        assert_eq!(out.matrix.get(1, 0), Some(0.7));
        assert!(out.matrix.get(1, 1).unwrap().is_nan());
        assert_eq!(out.summaries.len(), 2);
        assert_eq!(out.orphans, vec![root.join("ctrl/s1/cell1")]);
        assert_eq!(out.warnings.len(), 1, "{:?}", out.warnings);
    }

    #[test]
    fn test_empty_leaf_tolerated_or_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_log(root, "res_A/s1/cell1", "C1_log.txt", "0.5");
        stdfs::create_dir_all(root.join("res_A/s1/empty")).unwrap();

        let out = run_aggregation(&config(root, "", true)).unwrap();
        assert_eq!(out.matrix.rows(), 1);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("empty"));

        let err = run_aggregation(&config(root, "", false)).unwrap_err();
        assert!(matches!(
            err,
            WellMatrixError::EmptyResult(EmptyResultError::EmptyFolder { .. })
        ));
    }

    #[test]
    fn test_no_selected_groups() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path(), "ctrl/s1/cell1", "C1_log.txt", "0.5");
        let err = run_aggregation(&config(dir.path(), "", true)).unwrap_err();
        assert!(matches!(
            err,
            WellMatrixError::EmptyResult(EmptyResultError::NoGroups { .. })
        ));
    }

    #[test]
    fn test_zero_values_everywhere_still_build() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path(), "res_A/s1/cell1", "C1_log.txt", "0");
        let out = run_aggregation(&config(dir.path(), "", true)).unwrap();
        assert_eq!(out.matrix.rows(), 1);
        assert!(out.matrix.get(0, 0).unwrap().is_nan());
        assert_eq!(out.groups[0].values, vec![0.0]);
    }
}
