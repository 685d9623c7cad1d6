// wellmatrix - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Run configuration loading (config file + CLI overrides)
// 3. Logging initialisation (debug mode support)
// 4. Aggregation and export of the matrix / report

use clap::Parser;
use std::path::{Path, PathBuf};
use wellmatrix::app::run::{run_aggregation, AggregationOutput};
use wellmatrix::core::export::{self, RunReport};
use wellmatrix::platform::config::{self, PlatformPaths, RawConfig, RunConfig};
use wellmatrix::util::error::{ConfigError, ExportError, WellMatrixError};
use wellmatrix::util::{self, constants};

/// wellmatrix - aggregate per-folder microscopy measurements into a
/// NaN-padded observations x groups matrix.
///
/// Group folders sit directly under ROOT; measurement files live in leaf
/// folders two levels below each group.
#[derive(Parser, Debug)]
#[command(name = "wellmatrix", version, about)]
struct Cli {
    /// Root folder to aggregate (overrides [scan] root).
    root: Option<PathBuf>,

    /// Run configuration file (defaults to the platform config directory).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Write the matrix CSV here instead of stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Write a JSON report with records and summaries.
    #[arg(short = 'r', long = "report")]
    report: Option<PathBuf>,

    /// Rescale each column to [0, 1].
    #[arg(long)]
    rescale: bool,

    /// Drop values outside each column's 10th-90th percentile window.
    #[arg(long = "remove-outliers")]
    remove_outliers: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    let raw = match load_raw(&cli) {
        Ok(raw) => raw,
        Err(e) => fail(&e.into()),
    };

    util::logging::init(cli.debug, raw.logging.level.as_deref());
    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "wellmatrix starting"
    );

    let config = match apply_overrides(raw, &cli).validate() {
        Ok(c) => c,
        Err(e) => fail(&e.into()),
    };

    let output = match run_aggregation(&config) {
        Ok(o) => o,
        Err(e) => fail(&e),
    };

    for warning in &output.warnings {
        tracing::warn!(warning = %warning, "Run warning");
    }

    if let Err(e) = write_outputs(&config, &output) {
        fail(&e.into());
    }
}

/// Explicit `--config` must exist; the platform default is optional.
fn load_raw(cli: &Cli) -> Result<RawConfig, ConfigError> {
    match &cli.config {
        Some(path) => config::read_raw_config(path),
        None => {
            let path = PlatformPaths::resolve().default_config_file();
            if path.exists() {
                config::read_raw_config(&path)
            } else {
                Ok(RawConfig::default())
            }
        }
    }
}

fn apply_overrides(mut raw: RawConfig, cli: &Cli) -> RawConfig {
    if let Some(root) = &cli.root {
        raw.scan.root = Some(root.clone());
    }
    if let Some(output) = &cli.output {
        raw.output.matrix_csv = Some(output.clone());
    }
    if let Some(report) = &cli.report {
        raw.output.report_json = Some(report.clone());
    }
    if cli.rescale {
        raw.postprocess.rescale = Some(true);
    }
    if cli.remove_outliers {
        raw.postprocess.remove_outliers = Some(true);
    }
    raw
}

fn write_outputs(config: &RunConfig, output: &AggregationOutput) -> Result<(), ExportError> {
    match &config.matrix_csv {
        Some(path) => {
            let file = create(path)?;
            let rows = export::export_matrix_csv(&output.matrix, file, path)?;
            tracing::info!(path = %path.display(), rows, "Matrix written");
        }
        None => {
            let stdout = std::io::stdout().lock();
            export::export_matrix_csv(&output.matrix, stdout, Path::new("<stdout>"))?;
        }
    }

    if let Some(path) = &config.report_json {
        let report = RunReport {
            generated_at: chrono::Utc::now(),
            app_version: constants::APP_VERSION,
            root: &config.root,
            mode: config.mode.label(),
            matrix: &output.matrix,
            summaries: &output.summaries,
            groups: &output.groups,
            orphans: &output.orphans,
            warnings: &output.warnings,
        };
        let file = create(path)?;
        export::export_report_json(&report, file, path)?;
        tracing::info!(path = %path.display(), "Report written");
    }
    Ok(())
}

fn create(path: &Path) -> Result<std::io::BufWriter<std::fs::File>, ExportError> {
    std::fs::File::create(path)
        .map(std::io::BufWriter::new)
        .map_err(|e| ExportError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

fn fail(error: &WellMatrixError) -> ! {
    tracing::error!(error = %error, "Run failed");
    eprintln!("Error: {error}");
    std::process::exit(1);
}
