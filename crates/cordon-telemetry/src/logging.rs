//! Subscriber configuration and installation.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;

use crate::error::{TelemetryError, TelemetryResult};

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact single-line output.
    #[default]
    Compact,
    /// Multi-line human-readable output.
    Pretty,
    /// Newline-delimited JSON, for log shippers.
    Json,
}

/// Logging configuration.
///
/// The base level seeds an [`EnvFilter`]; per-target directives refine
/// it. The `RUST_LOG` environment variable, when set, overrides the
/// whole filter.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    format: LogFormat,
    directives: Vec<String>,
    with_target: bool,
}

impl LogConfig {
    /// A config with the given base level (`"trace"` .. `"error"`).
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            directives: Vec::new(),
            with_target: true,
        }
    }

    /// Select the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Add a per-target filter directive, e.g. `"cordon_link=debug"`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Include or omit the event's target module in output.
    #[must_use]
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        if std::env::var(EnvFilter::DEFAULT_ENV).is_ok() {
            return EnvFilter::try_from_default_env()
                .map_err(|e| TelemetryError::ConfigError(e.to_string()));
        }
        let mut spec = self.level.clone();
        for directive in &self.directives {
            spec.push(',');
            spec.push_str(directive);
        }
        spec.parse()
            .map_err(|e: tracing_subscriber::filter::ParseError| {
                TelemetryError::ConfigError(e.to_string())
            })
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Fails when the filter spec does not parse or a subscriber is already
/// installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let result = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| TelemetryError::InitError(e.to_string()))
}

/// Install a subscriber with default settings (`info`, compact).
///
/// # Errors
///
/// Fails when a subscriber is already installed.
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_extend_the_filter_spec() {
        let config = LogConfig::new("info")
            .with_directive("cordon_link=debug")
            .with_directive("cordon_boot=trace");
        let filter = config.build_filter().unwrap();
        let spec = filter.to_string();
        assert!(spec.contains("cordon_link=debug"));
        assert!(spec.contains("cordon_boot=trace"));
    }

    #[test]
    fn bad_level_is_a_config_error() {
        let config = LogConfig::new("noisy[");
        assert!(matches!(
            config.build_filter(),
            Err(TelemetryError::ConfigError(_))
        ));
    }
}
