use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Target prefix shared by the library and the `bursar` binary.
const BILLING_TARGET: &str = "bursar";

/// Level applied to dependencies when the configured level is a bare level name.
const DEPENDENCY_LEVEL: &str = "warn";

#[derive(Debug)]
pub enum TelemetryError {
    InvalidFilter { directives: String, source: ParseError },
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidFilter { directives, .. } => write!(
                f,
                "APP_LOG_LEVEL/RUST_LOG directives '{directives}' are not a valid tracing filter"
            ),
            TelemetryError::AlreadyInstalled(err) => {
                write!(f, "a tracing subscriber is already installed: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidFilter { source, .. } => Some(source),
            TelemetryError::AlreadyInstalled(err) => Some(&**err),
        }
    }
}

/// Expands a bare level such as `debug` so it only raises billing events; dependencies stay at
/// `warn`. Full directive lists are passed through unchanged.
pub fn directives_for(log_level: &str) -> String {
    let log_level = log_level.trim();
    if log_level.contains('=') || log_level.contains(',') {
        return log_level.to_string();
    }
    format!("{DEPENDENCY_LEVEL},{BILLING_TARGET}={log_level}")
}

/// `RUST_LOG` when set, otherwise the configured level expanded by [`directives_for`].
pub fn filter_for(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    let directives = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(raw) if !raw.trim().is_empty() => raw,
        _ => directives_for(&config.log_level),
    };

    EnvFilter::try_new(&directives)
        .map_err(|source| TelemetryError::InvalidFilter { directives, source })
}

/// Installs the global subscriber. Events go to stderr so command output on stdout stays
/// machine readable.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(config)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)
}
