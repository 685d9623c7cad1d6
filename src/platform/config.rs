// wellmatrix - platform/config.rs
//
// Run configuration: platform config directory resolution, TOML loading,
// and validation into a `RunConfig`.
//
// Every parameter the aggregation needs is explicit. Required keys that are
// absent fail fast with `ConfigError::MissingField`; nothing is prompted for.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::core::model::{ExtractionMode, MeasurementField, SelectorSpec};
use crate::core::parser::{ExtractionSpec, FreeTextParams, StructuredParams};
use crate::core::postprocess::PostProcessConfig;
use crate::core::selector::CompiledSelector;
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for wellmatrix configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/wellmatrix/ or %APPDATA%\wellmatrix\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of the run configuration file.
    pub fn default_config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// Raw TOML shape
// =============================================================================

/// Raw deserialisable shape of the run configuration file.
///
/// Every field is optional here; presence and ranges are checked by
/// [`RawConfig::validate`]. Unknown keys are ignored.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[scan]` section.
    pub scan: ScanSection,
    /// `[extraction]` section.
    pub extraction: ExtractionSection,
    /// `[postprocess]` section.
    pub postprocess: PostProcessSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
    /// `[output]` section.
    pub output: OutputSection,
}

/// `[scan]` config section.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ScanSection {
    pub root: Option<PathBuf>,
    pub folder_selector: Option<String>,
    pub subfolder_selector: Option<String>,
    pub file_selector: Option<String>,
    pub strict_selector: Option<bool>,
    pub ignore_empty_folders: Option<bool>,
}

/// `[extraction]` config section.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ExtractionSection {
    /// "structured" or "free_text".
    pub mode: Option<String>,
    /// Glob matched against filenames in each leaf folder.
    pub file_pattern: Option<String>,
    /// Dataset label (structured) or channel/file ID (free_text).
    pub label: Option<String>,
    /// Marker line text (free_text).
    pub marker: Option<String>,
    /// Structured field aggregated into the matrix.
    pub measurement: Option<String>,
    pub required_columns: Option<Vec<String>>,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub min_circ: Option<f64>,
}

/// `[postprocess]` config section.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default)]
pub struct PostProcessSection {
    pub rescale: Option<bool>,
    pub remove_outliers: Option<bool>,
}

/// `[logging]` config section.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// `[output]` config section.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Matrix CSV path (stdout when unset).
    pub matrix_csv: Option<PathBuf>,
    /// JSON report path (no report when unset).
    pub report_json: Option<PathBuf>,
}

// =============================================================================
// Validated configuration
// =============================================================================

/// Validated parameters of one aggregation run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub root: PathBuf,
    pub folder_selector: CompiledSelector,
    pub subfolder_selector: CompiledSelector,
    pub file_selector: CompiledSelector,
    /// Skip (true) or fail on (false) leaf folders with no matching file.
    pub ignore_empty_folders: bool,
    pub file_pattern: glob::Pattern,
    pub mode: ExtractionMode,
    pub extraction: ExtractionSpec,
    /// Structured field aggregated into the matrix.
    pub measurement: MeasurementField,
    pub postprocess: PostProcessConfig,
    pub log_level: Option<String>,
    pub matrix_csv: Option<PathBuf>,
    pub report_json: Option<PathBuf>,
}

impl RawConfig {
    /// Check presence and ranges of every parameter and build a `RunConfig`.
    /// The first problem found is returned.
    pub fn validate(self) -> Result<RunConfig, ConfigError> {
        let scan = self.scan;
        let ext = self.extraction;

        let root = scan
            .root
            .ok_or(ConfigError::MissingField { field: "scan.root" })?;
        let strict = scan.strict_selector.ok_or(ConfigError::MissingField {
            field: "scan.strict_selector",
        })?;
        let ignore_empty_folders = scan.ignore_empty_folders.ok_or(ConfigError::MissingField {
            field: "scan.ignore_empty_folders",
        })?;

        let folder_selector = compile_selector("scan.folder_selector", scan.folder_selector, strict)?;
        let subfolder_selector =
            compile_selector("scan.subfolder_selector", scan.subfolder_selector, strict)?;
        let file_selector = compile_selector("scan.file_selector", scan.file_selector, strict)?;

        let mode = match ext.mode.as_deref().map(str::to_lowercase).as_deref() {
            Some("structured") => ExtractionMode::Structured,
            Some("free_text") | Some("freetext") => ExtractionMode::FreeText,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    field: "extraction.mode",
                    value: other.to_string(),
                    expected: "\"structured\" or \"free_text\"".to_string(),
                })
            }
            None => {
                return Err(ConfigError::MissingField {
                    field: "extraction.mode",
                })
            }
        };

        let pattern = ext.file_pattern.ok_or(ConfigError::MissingField {
            field: "extraction.file_pattern",
        })?;
        let file_pattern = glob::Pattern::new(&pattern)
            .map_err(|source| ConfigError::InvalidGlob { pattern, source })?;

        let measurement = match ext.measurement {
            Some(name) => parse_field("extraction.measurement", &name)?,
            None => parse_field("extraction.measurement", constants::DEFAULT_MEASUREMENT)?,
        };
        if !measurement.is_numeric() {
            return Err(ConfigError::InvalidValue {
                field: "extraction.measurement",
                value: measurement.label().to_string(),
                expected: "a numeric column (Area, Mean, IntDen, StdDev, Max, Circ)".to_string(),
            });
        }

        let label = ext.label.filter(|l| !l.trim().is_empty());

        let extraction = match mode {
            ExtractionMode::FreeText => {
                let channel_id = label.ok_or(ConfigError::MissingField {
                    field: "extraction.label",
                })?;
                let marker = ext
                    .marker
                    .filter(|m| !m.trim().is_empty())
                    .ok_or(ConfigError::MissingField {
                        field: "extraction.marker",
                    })?;
                ExtractionSpec::FreeText(FreeTextParams { channel_id, marker })
            }
            ExtractionMode::Structured => {
                let mut required_columns = match ext.required_columns {
                    Some(names) => names
                        .iter()
                        .map(|n| parse_field("extraction.required_columns", n))
                        .collect::<Result<Vec<_>, _>>()?,
                    None => MeasurementField::all().to_vec(),
                };
                // The aggregated field must exist in every table.
                if !required_columns.contains(&measurement) {
                    required_columns.push(measurement);
                }
                let min_area = finite("extraction.min_area", ext.min_area, constants::DEFAULT_MIN_AREA)?;
                let max_area = ext.max_area.unwrap_or(constants::DEFAULT_MAX_AREA);
                if max_area.is_nan() || max_area <= min_area {
                    return Err(ConfigError::InvalidValue {
                        field: "extraction.max_area",
                        value: max_area.to_string(),
                        expected: format!("a number greater than min_area ({min_area})"),
                    });
                }
                let min_circ = finite("extraction.min_circ", ext.min_circ, constants::DEFAULT_MIN_CIRC)?;
                ExtractionSpec::Structured(StructuredParams {
                    dataset_label: label,
                    required_columns,
                    min_area,
                    max_area,
                    min_circ,
                })
            }
        };

        let log_level = match self.logging.level {
            Some(level) => {
                let valid = ["error", "warn", "info", "debug", "trace"];
                if !valid.contains(&level.to_lowercase().as_str()) {
                    return Err(ConfigError::InvalidValue {
                        field: "logging.level",
                        value: level,
                        expected: "error, warn, info, debug, or trace".to_string(),
                    });
                }
                Some(level)
            }
            None => None,
        };

        Ok(RunConfig {
            root,
            folder_selector,
            subfolder_selector,
            file_selector,
            ignore_empty_folders,
            file_pattern,
            mode,
            extraction,
            measurement,
            postprocess: PostProcessConfig {
                remove_outliers: self.postprocess.remove_outliers.unwrap_or(false),
                rescale: self.postprocess.rescale.unwrap_or(false),
            },
            log_level,
            matrix_csv: self.output.matrix_csv,
            report_json: self.output.report_json,
        })
    }
}

fn compile_selector(
    field: &'static str,
    pattern: Option<String>,
    strict: bool,
) -> Result<CompiledSelector, ConfigError> {
    let spec = SelectorSpec::new(pattern.unwrap_or_default(), strict);
    CompiledSelector::compile(&spec).map_err(|source| ConfigError::InvalidRegex {
        field,
        pattern: spec.pattern.clone(),
        source,
    })
}

fn parse_field(field: &'static str, name: &str) -> Result<MeasurementField, ConfigError> {
    MeasurementField::from_header(name).ok_or_else(|| ConfigError::InvalidValue {
        field,
        value: name.to_string(),
        expected: format!(
            "one of {}",
            MeasurementField::all()
                .iter()
                .map(|f| f.label())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    })
}

fn finite(field: &'static str, value: Option<f64>, default: f64) -> Result<f64, ConfigError> {
    match value {
        Some(v) if !v.is_finite() => Err(ConfigError::InvalidValue {
            field,
            value: v.to_string(),
            expected: "a finite number".to_string(),
        }),
        Some(v) => Ok(v),
        None => Ok(default),
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Parse TOML `content`; `path` is used for error context only.
pub fn parse_raw_config(content: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the raw configuration from `path`.
pub fn read_raw_config(path: &Path) -> Result<RawConfig, ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > constants::MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max: constants::MAX_CONFIG_FILE_SIZE,
        });
    }
    let content = std::fs::read_to_string(path).map_err(io_err)?;
    let raw = parse_raw_config(&content, path)?;
    tracing::info!(path = %path.display(), "Loaded run configuration");
    Ok(raw)
}

/// Read and validate the run configuration at `path`.
pub fn load_run_config(path: &Path) -> Result<RunConfig, ConfigError> {
    read_raw_config(path)?.validate()
}
