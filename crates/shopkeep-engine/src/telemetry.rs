//! Tracing setup for binaries that embed the engine.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,shopkeep=debug,sqlx=warn";

/// Installs a `fmt` subscriber filtered by `RUST_LOG`.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - every query the repositories run
/// - `RUST_LOG=shopkeep_engine=trace` - engine only
/// - Default: `info,shopkeep=debug,sqlx=warn`
///
/// Logs go to stderr so command output on stdout stays parseable.
/// Calling it twice is harmless.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
