use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(
                    f,
                    "invalid log level/filter '{}': unable to build EnvFilter",
                    value
                )
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Resolve the log filter, preferring `RUST_LOG` over the configured level.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    resolve_filter(from_env.as_deref(), &config.log_level)
}

/// An unparsable override falls back to the configured directives.
fn resolve_filter(
    override_directive: Option<&str>,
    configured: &str,
) -> Result<EnvFilter, TelemetryError> {
    if let Some(filter) = override_directive.and_then(|value| EnvFilter::try_new(value).ok()) {
        return Ok(filter);
    }
    EnvFilter::try_new(configured).map_err(|source| TelemetryError::EnvFilter {
        value: configured.to_string(),
        source,
    })
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = env_filter(config)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_filter_for_module_directives() {
        assert!(resolve_filter(None, "info,his_core::store=debug").is_ok());
    }

    #[test]
    fn rejects_malformed_directives() {
        match resolve_filter(None, "his_core=loud") {
            Err(TelemetryError::EnvFilter { value, .. }) => assert_eq!(value, "his_core=loud"),
            other => panic!("expected filter error, got {other:?}"),
        }
    }

    #[test]
    fn override_wins_over_configured_level() {
        let filter = resolve_filter(Some("warn"), "his_core=loud").expect("override applies");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn unparsable_override_falls_back_to_configured_level() {
        let filter = resolve_filter(Some("his_core=loud"), "debug").expect("fallback applies");
        assert_eq!(filter.to_string(), "debug");
    }
}
