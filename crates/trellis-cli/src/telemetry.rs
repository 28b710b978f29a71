//! Structured telemetry initialisation for the command-line host.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: the first invocation installs the
/// subscriber and later ones leave the global state untouched.
///
/// Diagnostics go to stderr so that plugin `console.log` output on stdout
/// stays machine-consumable.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter expression does not parse
/// or a global subscriber is already installed by other means.
pub fn initialise(log_filter: &str) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(log_filter))
        .copied()
}

fn install_subscriber(log_filter: &str) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(log_filter)
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        // Avoid stray colour codes in non-TTY sinks while keeping colour
        // on interactive terminals.
        .with_ansi(io::stderr().is_terminal())
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::from)
}
