// wellmatrix - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// All errors preserve the causal chain for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for a wellmatrix run.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum WellMatrixError {
    /// Folder discovery failed.
    Discovery(DiscoveryError),

    /// A measurement file could not be extracted.
    Extract(ExtractError),

    /// Nothing left to aggregate.
    EmptyResult(EmptyResultError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// Export operation failed.
    Export(ExportError),
}

impl fmt::Display for WellMatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::Extract(e) => write!(f, "Extraction error: {e}"),
            Self::EmptyResult(e) => write!(f, "Empty result: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
        }
    }
}

impl std::error::Error for WellMatrixError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Discovery(e) => Some(e),
            Self::Extract(e) => Some(e),
            Self::EmptyResult(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Export(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to folder discovery.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The root scan path does not exist or is not accessible.
    RootNotFound { path: PathBuf },

    /// The root path is not a directory.
    NotADirectory { path: PathBuf },

    /// Permission denied accessing the root path.
    PermissionDenied { path: PathBuf, source: io::Error },

    /// Requested depth is outside 1..=MAX_SCAN_DEPTH.
    InvalidDepth { depth: usize, max: usize },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "Root path '{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "Root path '{}' is not a directory", path.display())
            }
            Self::PermissionDenied { path, source } => {
                write!(
                    f,
                    "Permission denied accessing '{}': {source}",
                    path.display()
                )
            }
            Self::InvalidDepth { depth, max } => {
                write!(f, "Scan depth {depth} is out of range (1-{max})")
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PermissionDenied { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DiscoveryError> for WellMatrixError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Extraction errors
// ---------------------------------------------------------------------------

/// Fatal errors extracting a single measurement file.
#[derive(Debug)]
pub enum ExtractError {
    /// Required structured columns are absent from the table header.
    Schema {
        file: PathBuf,
        missing: Vec<String>,
    },

    /// The table could not be read as delimited records.
    Csv { file: PathBuf, source: csv::Error },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema { file, missing } => write!(
                f,
                "'{}': missing required column(s): {}",
                file.display(),
                missing.join(", ")
            ),
            Self::Csv { file, source } => {
                write!(f, "'{}': malformed table: {source}", file.display())
            }
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Csv { source, .. } => Some(source),
            Self::Schema { .. } => None,
        }
    }
}

impl From<ExtractError> for WellMatrixError {
    fn from(e: ExtractError) -> Self {
        Self::Extract(e)
    }
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Non-fatal, per-line extraction failures. The affected value is omitted
/// and the error is reported as a warning.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A marker line carried no numeric token.
    NoNumericValue {
        file: PathBuf,
        line_number: u64,
        line: String,
    },

    /// A structured cell could not be parsed as a number.
    InvalidNumber {
        file: PathBuf,
        line_number: u64,
        column: String,
        raw: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoNumericValue {
                file,
                line_number,
                line,
            } => write!(
                f,
                "'{}' line {line_number}: no numeric value in '{line}'",
                file.display()
            ),
            Self::InvalidNumber {
                file,
                line_number,
                column,
                raw,
            } => write!(
                f,
                "'{}' line {line_number}: column '{column}' value '{raw}' is not a number",
                file.display()
            ),
        }
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// Empty result errors
// ---------------------------------------------------------------------------

/// Raised when a run has nothing (or not enough) to aggregate.
#[derive(Debug)]
pub enum EmptyResultError {
    /// No group folder survived selection.
    NoGroups { root: PathBuf },

    /// A leaf folder held no matching file and empty folders are not tolerated.
    EmptyFolder { folder: PathBuf, pattern: String },

    /// Every group's value list was empty.
    NoValues { groups: usize },
}

impl fmt::Display for EmptyResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoGroups { root } => write!(
                f,
                "No group folder under '{}' matched the folder selector",
                root.display()
            ),
            Self::EmptyFolder { folder, pattern } => write!(
                f,
                "Leaf folder '{}' has no file matching '{pattern}'. \
                 Set ignore_empty_folders = true to skip such folders.",
                folder.display()
            ),
            Self::NoValues { groups } => write!(
                f,
                "No measurement value was extracted from any of {groups} group(s)"
            ),
        }
    }
}

impl std::error::Error for EmptyResultError {}

impl From<EmptyResultError> for WellMatrixError {
    fn from(e: EmptyResultError) -> Self {
        Self::EmptyResult(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to run configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A required parameter is absent.
    MissingField { field: &'static str },

    /// A selector is not a valid regular expression.
    InvalidRegex {
        field: &'static str,
        pattern: String,
        source: regex::Error,
    },

    /// The file pattern is not a valid glob.
    InvalidGlob {
        pattern: String,
        source: glob::PatternError,
    },

    /// A value is not one of the accepted choices or is out of range.
    InvalidValue {
        field: &'static str,
        value: String,
        expected: String,
    },

    /// Config file exceeds the maximum allowed size.
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    /// I/O error reading the config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::MissingField { field } => {
                write!(f, "Required parameter '{field}' is not set")
            }
            Self::InvalidRegex {
                field,
                pattern,
                source,
            } => write!(f, "'{field}' = '{pattern}' is not a valid regex: {source}"),
            Self::InvalidGlob { pattern, source } => {
                write!(f, "File pattern '{pattern}' is not a valid glob: {source}")
            }
            Self::InvalidValue {
                field,
                value,
                expected,
            } => write!(f, "'{field}' = '{value}' is invalid. Expected: {expected}"),
            Self::FileTooLarge { path, size, max } => write!(
                f,
                "Config '{}' is {size} bytes, exceeds maximum of {max} bytes",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::InvalidRegex { source, .. } => Some(source),
            Self::InvalidGlob { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for WellMatrixError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<ExportError> for WellMatrixError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

/// Convenience type alias for wellmatrix results.
pub type Result<T> = std::result::Result<T, WellMatrixError>;
