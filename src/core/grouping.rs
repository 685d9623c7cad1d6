// wellmatrix - core/grouping.rs
//
// Assigns leaf folders to the group folder that contains them.
// Core layer: pure path logic, no filesystem access.

use crate::core::model::Group;
use std::path::{Path, PathBuf};

/// Result of assigning leaves to groups.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    /// One entry per group root, in the order the roots were given.
    pub groups: Vec<Group>,

    /// Leaves contained in no group root.
    pub orphans: Vec<PathBuf>,
}

/// Assign each leaf to the group root that is a proper, component-bounded
/// prefix of it.
///
/// `res_A` is not a prefix of `res_AB/...` because `Path::starts_with`
/// compares whole components. When roots are nested, the longest (most
/// specific) root wins, so a leaf is never counted twice. Leaf order within
/// a group follows the order of `leaves`.
pub fn group_leaves(groups: &[PathBuf], leaves: &[PathBuf]) -> Grouping {
    let mut result = Grouping {
        groups: groups
            .iter()
            .map(|root| Group {
                name: root_name(root),
                root: root.clone(),
                leaves: Vec::new(),
            })
            .collect(),
        orphans: Vec::new(),
    };

    for leaf in leaves {
        match owning_group(groups, leaf) {
            Some(idx) => result.groups[idx].leaves.push(leaf.clone()),
            None => {
                tracing::warn!(leaf = %leaf.display(), "Leaf folder belongs to no selected group");
                result.orphans.push(leaf.clone());
            }
        }
    }

    tracing::debug!(
        groups = result.groups.len(),
        leaves = leaves.len(),
        orphans = result.orphans.len(),
        "Leaf grouping complete"
    );

    result
}

/// Index of the most specific group root containing `leaf`.
fn owning_group(groups: &[PathBuf], leaf: &Path) -> Option<usize> {
    let mut candidates = groups
        .iter()
        .enumerate()
        .filter(|(_, root)| leaf != root.as_path() && leaf.starts_with(root));

    let first = candidates.next()?;
    let mut best = first;
    let mut ambiguous = false;
    for candidate in candidates {
        ambiguous = true;
        if candidate.1.components().count() > best.1.components().count() {
            best = candidate;
        }
    }

    if ambiguous {
        tracing::debug!(
            leaf = %leaf.display(),
            chosen = %best.1.display(),
            "Nested group roots; assigned leaf to the longest prefix"
        );
    }

    Some(best.0)
}

fn root_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}
