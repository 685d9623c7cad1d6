// wellmatrix - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "wellmatrix";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "wellmatrix";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Folder hierarchy
// =============================================================================

/// Depth (below the root) of group/well folders.
pub const GROUP_DEPTH: usize = 1;

/// Depth of subfolders inside each group.
pub const SUBFOLDER_DEPTH: usize = 2;

/// Depth of leaf folders that hold the measurement files.
pub const LEAF_DEPTH: usize = 3;

/// Hard upper bound on scan depth. The folder layout never goes deeper
/// than the leaf level.
pub const MAX_SCAN_DEPTH: usize = LEAF_DEPTH;

// =============================================================================
// Extraction
// =============================================================================

/// Structured field aggregated when the config does not name one.
pub const DEFAULT_MEASUREMENT: &str = "Mean";

/// Default lower Area bound (exclusive).
pub const DEFAULT_MIN_AREA: f64 = 0.0;

/// Default upper Area bound (exclusive).
pub const DEFAULT_MAX_AREA: f64 = f64::INFINITY;

/// Default lower circularity bound (exclusive).
pub const DEFAULT_MIN_CIRC: f64 = 0.0;

/// Maximum number of parse warnings kept per file before suppression.
pub const MAX_PARSE_ERRORS_PER_FILE: usize = 100;

/// Maximum number of warnings carried in a run's output.
pub const MAX_WARNINGS: usize = 1_000;

/// Maximum characters of a source line quoted in a warning.
pub const MAX_LINE_PREVIEW: usize = 120;

// =============================================================================
// Post-processing
// =============================================================================

/// Lower percentile of the outlier window.
pub const OUTLIER_LOWER_PERCENTILE: f64 = 10.0;

/// Upper percentile of the outlier window.
pub const OUTLIER_UPPER_PERCENTILE: f64 = 90.0;

// =============================================================================
// Logging / files
// =============================================================================

/// Default log level when neither RUST_LOG, --debug, nor config sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Name of the run configuration file in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "wellmatrix.toml";

/// Maximum size of a run configuration file.
pub const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024; // 64 KB

/// Text written for missing cells in CSV exports.
pub const NAN_CELL: &str = "NaN";
