//! Diagnostic logging to stderr, controlled by `RUST_LOG`.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

pub(crate) const DEFAULT_DIRECTIVE: &str = "warn";

/// Installs the global subscriber. Stays quiet below `warn` unless `RUST_LOG`
/// asks for more. Failures the user already sees on the console are logged at
/// `debug`, so they only show up on stderr when asked for.
pub fn init_logging() -> Result<()> {
    let directive = filter_directive(std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| anyhow!("Invalid RUST_LOG directive '{}': {}", directive, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

fn filter_directive(from_env: Option<String>) -> String {
    from_env
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}
