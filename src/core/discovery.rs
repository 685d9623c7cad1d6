// wellmatrix - core/discovery.rs
//
// Depth-bounded folder listing for the group / subfolder / leaf hierarchy.
//
// Uses `walkdir` for traversal and reads directory entries only, never file
// contents. Hidden (dot-prefixed) entries are pruned via filter_entry so
// their subtrees are never visited.
//
// Per-entry I/O errors are non-fatal and collected as warnings; only an
// invalid root is an error.

use crate::core::model::PathNode;
use crate::util::constants;
use crate::util::error::DiscoveryError;
use std::path::Path;

/// List every non-hidden directory exactly `depth` levels below `root`.
///
/// Entries are sorted by name within each directory, so two scans of an
/// unchanged tree return the same order. Callers should still only rely on
/// index correspondence within the result of one call.
///
/// # Fatal errors
/// `RootNotFound`, `NotADirectory`, `PermissionDenied` for the root, and
/// `InvalidDepth` when `depth` is outside `1..=MAX_SCAN_DEPTH`.
pub fn scan(root: &Path, depth: usize) -> Result<(Vec<PathNode>, Vec<String>), DiscoveryError> {
    if !(1..=constants::MAX_SCAN_DEPTH).contains(&depth) {
        return Err(DiscoveryError::InvalidDepth {
            depth,
            max: constants::MAX_SCAN_DEPTH,
        });
    }

    check_root(root)?;

    tracing::debug!(root = %root.display(), depth, "Folder scan starting");

    let mut nodes: Vec<PathNode> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let walker = walkdir::WalkDir::new(root)
        .max_depth(depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let msg = format!("Cannot access '{path_str}': {e}");
                tracing::debug!(warning = %msg, "Discovery warning");
                warnings.push(msg);
                continue;
            }
        };

        // min_depth is not used: entries it skips never reach filter_entry,
        // so hidden intermediate folders would not be pruned.
        if entry.depth() != depth || !entry.file_type().is_dir() {
            continue;
        }

        nodes.push(PathNode {
            path: entry.into_path(),
            depth,
        });
    }

    tracing::debug!(
        depth,
        folders = nodes.len(),
        warnings = warnings.len(),
        "Folder scan complete"
    );

    Ok((nodes, warnings))
}

/// Validate that `root` exists and is a directory.
///
/// Uses `fs::metadata()` rather than `Path::is_dir()` so that an
/// access-denied root is reported as such instead of as missing.
fn check_root(root: &Path) -> Result<(), DiscoveryError> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DiscoveryError::NotADirectory {
            path: root.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(DiscoveryError::PermissionDenied {
                path: root.to_path_buf(),
                source: e,
            })
        }
        Err(_) => Err(DiscoveryError::RootNotFound {
            path: root.to_path_buf(),
        }),
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_temp_tree() -> TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();

        for leaf in [
            "res_B/sub1/leafA",
            "res_A/sub1/leafA",
            "res_A/sub1/leafB",
            "res_A/sub2/leafC",
            ".hidden/sub/leaf",
            "res_A/.cache/leaf",
        ] {
            fs::create_dir_all(root.join(leaf)).expect("mkdir");
        }
        fs::write(root.join("notes.txt"), "not a folder").expect("write notes");
        fs::write(root.join("res_A/sub1/leafA/Results.csv"), "x").expect("write csv");

        dir
    }

    fn names(nodes: &[PathNode]) -> Vec<String> {
        nodes.iter().map(|n| n.name().to_string()).collect()
    }

    #[test]
    fn test_level_one_lists_groups_only() {
        let dir = make_temp_tree();
        let (nodes, warnings) = scan(dir.path(), 1).unwrap();
        assert_eq!(names(&nodes), vec!["res_A", "res_B"]);
        assert!(nodes.iter().all(|n| n.depth == 1));
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_level_three_skips_hidden_subtrees() {
        let dir = make_temp_tree();
        let (nodes, _) = scan(dir.path(), 3).unwrap();
        let paths: Vec<_> = nodes
            .iter()
            .map(|n| n.path.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(paths.len(), 4, "got {paths:?}");
        assert!(paths
            .iter()
            .all(|p| !p.to_string_lossy().contains(".hidden") && !p.to_string_lossy().contains(".cache")));
    }

    #[test]
    fn test_files_are_not_listed() {
        let dir = make_temp_tree();
        let (nodes, _) = scan(dir.path(), 1).unwrap();
        assert!(!names(&nodes).contains(&"notes.txt".to_string()));
    }

    #[test]
    fn test_root_not_found() {
        let result = scan(Path::new("/nonexistent/path/wellmatrix"), 1);
        assert!(matches!(result, Err(DiscoveryError::RootNotFound { .. })));
    }

    #[test]
    fn test_root_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "content").unwrap();
        let result = scan(&file, 1);
        assert!(matches!(result, Err(DiscoveryError::NotADirectory { .. })));
    }

    #[test]
    fn test_depth_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            scan(dir.path(), 0),
            Err(DiscoveryError::InvalidDepth { .. })
        ));
        assert!(matches!(
            scan(dir.path(), 4),
            Err(DiscoveryError::InvalidDepth { .. })
        ));
    }
}
