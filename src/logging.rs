//! Logging setup for tendies.
//!
//! Diagnostics go to stderr through the `tracing` ecosystem so that stdout
//! stays free for command output. `RUST_LOG` always wins over the level
//! chosen here.
//!
//! ```rust
//! use tendies::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default());
//! tracing::info!("collector started");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display.
    pub level: LogLevel,
    /// Output format for log messages.
    pub format: LogFormat,
    /// Include timestamps in log output.
    pub timestamps: bool,
    /// Include target (module path) in log output.
    pub target: bool,
    /// Enable ANSI colors in output.
    pub colors: bool,
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human-readable format.
    Pretty,
    /// Compact single-line format.
    Compact,
    /// Single-line format with file and line numbers.
    Full,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            timestamps: true,
            target: false,
            colors: true,
        }
    }
}

impl LogConfig {
    /// Errors only, no timestamps. Used for scheduled runs with `--quiet`.
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            format: LogFormat::Compact,
            timestamps: false,
            target: false,
            colors: true,
        }
    }

    /// Debug level with module targets.
    #[must_use]
    pub const fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            timestamps: true,
            target: true,
            colors: true,
        }
    }

    /// Disable colors, e.g. when `NO_COLOR` is set.
    #[must_use]
    pub const fn without_colors(mut self) -> Self {
        self.colors = false;
        self
    }
}

impl LogLevel {
    /// Convert to env filter directive string.
    const fn to_filter_string(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Off => "off",
        }
    }
}

/// Build the env filter for a level, deferring to `RUST_LOG` when set.
fn env_filter(level: LogLevel) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(format!("tendies={}", level.to_filter_string()))
    }
}

/// Initialize the logging system with the given configuration.
///
/// Subsequent calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = env_filter(config.level);
    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.colors)
        .with_target(config.target);

    // Each arm yields a differently typed layer, so registration happens per arm.
    match (config.format, config.timestamps) {
        (LogFormat::Pretty, true) => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(base.pretty())
                .try_init();
        }
        (LogFormat::Pretty, false) => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(base.pretty().without_time())
                .try_init();
        }
        (LogFormat::Compact, true) => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(base.compact())
                .try_init();
        }
        (LogFormat::Compact, false) => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(base.compact().without_time())
                .try_init();
        }
        (LogFormat::Full, _) => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(base.with_file(true).with_line_number(true))
                .try_init();
        }
    }
}

/// Initialize logging with defaults suitable for CLI use.
pub fn init_cli_logging(quiet: bool, verbose: bool, colors: bool) {
    let config = if quiet {
        LogConfig::quiet()
    } else if verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let config = if colors { config } else { config.without_colors() };
    init_logging(&config);
}

/// Logs the start and end of one pipeline step with its duration.
pub struct OperationGuard {
    name: String,
    start: std::time::Instant,
}

impl OperationGuard {
    /// Start tracking an operation.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        tracing::info!(operation = %name, "Starting operation");
        Self {
            name,
            start: std::time::Instant::now(),
        }
    }

    /// Complete the operation successfully.
    pub fn complete(self) {
        tracing::info!(
            operation = %self.name,
            duration_ms = self.start.elapsed().as_millis(),
            "Operation completed"
        );
    }

    /// Mark the operation as failed.
    pub fn fail(self, error: &dyn std::error::Error) {
        tracing::error!(
            operation = %self.name,
            duration_ms = self.start.elapsed().as_millis(),
            error = %error,
            "Operation failed"
        );
    }
}
