//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Log output shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Structured JSON lines, for log shipping in production.
    #[default]
    Json,
    /// Human-readable output, for local debugging and test runs.
    Pretty,
}

/// Subscriber configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Filter applied when `RUST_LOG` is not set. The default keeps the
    /// pipeline crates at `info` and everything else quiet.
    pub default_filter: String,
    pub format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            default_filter: "warn,acumen_pipeline=info,acumen_analysis=info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl ObservabilityConfig {
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Initialize tracing/logging for the process with defaults.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(ObservabilityConfig::default());
}

/// Initialize tracing/logging with an explicit configuration.
///
/// `RUST_LOG` still wins over the configured filter when set.
pub fn init_with(config: ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}
