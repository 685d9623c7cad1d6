// wellmatrix - util/logging.rs
//
// Structured logging with runtime-selectable level.
//
// Activation:
//   - Environment variable: RUST_LOG=debug (or trace)
//   - CLI flag: --debug
//   - Config file: [logging] level = "debug"
//
// Output: stderr only, so the matrix can be piped from stdout.

use super::constants;
use tracing_subscriber::EnvFilter;

/// Level directive used when RUST_LOG is unset.
///
/// `--debug` beats the config level, which beats `DEFAULT_LOG_LEVEL`.
pub fn level_directive(debug_flag: bool, config_level: Option<&str>) -> String {
    if debug_flag {
        return "debug".to_string();
    }
    config_level
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| constants::DEFAULT_LOG_LEVEL.to_string())
}

/// Initialise the logging subsystem.
///
/// Priority: RUST_LOG env var > CLI --debug flag > config level > default "info".
pub fn init(debug_flag: bool, config_level: Option<&str>) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(level_directive(debug_flag, config_level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(debug_flag)
        .with_line_number(debug_flag)
        .compact()
        .init();

    tracing::debug!(
        app = constants::APP_NAME,
        version = constants::APP_VERSION,
        "Logging initialised"
    );
}
