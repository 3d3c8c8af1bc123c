//! Custom error types for tendies.
//!
//! Variants are grouped by how the pipeline treats them: configuration
//! problems abort before any network call, fetch failures abort the current
//! category, and persistence read failures are recovered by the caller.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for tendies operations.
#[derive(Error, Debug)]
pub enum TendiesError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Generic configuration problem.
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// A ticker reference list is missing.
    #[error("Ticker reference list not found at '{path}'")]
    MissingReferenceData { path: PathBuf },

    /// A ticker reference list has no usable symbols.
    #[error("Ticker reference list '{path}' contains no symbols")]
    EmptyReferenceData { path: PathBuf },

    /// Credentials file missing or incomplete.
    #[error("Invalid credentials in '{path}': {reason}")]
    Credentials { path: PathBuf, reason: String },

    /// Configuration file parsing error.
    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigFile { path: PathBuf, reason: String },

    /// Invalid command-line argument.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // =========================================================================
    // Fetch Errors
    // =========================================================================
    /// Transport-level failure talking to the forum API.
    #[error("Forum API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The forum API answered with a non-success status.
    #[error("Forum API returned {status} for {url}")]
    Api { status: StatusCode, url: String },

    /// The forum API answered with a payload we could not use.
    #[error("Unexpected forum API response: {reason}")]
    ApiResponse { reason: String },

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// Curated dataset missing or unparseable.
    #[error("Could not read curated dataset '{path}': {reason}")]
    PersistenceRead { path: PathBuf, reason: String },

    /// Delimited table read/write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File read/write error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for tendies operations.
pub type Result<T> = std::result::Result<T, TendiesError>;

impl TendiesError {
    /// Create a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a credentials error.
    pub fn credentials(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Credentials {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create an API response error.
    pub fn api_response(reason: impl Into<String>) -> Self {
        Self::ApiResponse {
            reason: reason.into(),
        }
    }

    /// Create a persistence read error.
    pub fn persistence_read(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::PersistenceRead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a path error with context.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Configuration errors are fatal and raised before any network call.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::MissingReferenceData { .. }
                | Self::EmptyReferenceData { .. }
                | Self::Credentials { .. }
                | Self::ConfigFile { .. }
                | Self::InvalidArgument { .. }
        )
    }

    /// Fetch errors abort the current category only.
    #[must_use]
    pub const fn is_fetch(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Api { .. } | Self::ApiResponse { .. })
    }

    /// Check if this error is recovered locally instead of propagated.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::PersistenceRead { .. })
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::MissingReferenceData { .. } | Self::EmptyReferenceData { .. } => Some(
                "Download the NYSE and NASDAQ listed symbol CSVs and set paths.nyse_tickers / paths.nasdaq_tickers.",
            ),
            Self::Credentials { .. } => Some(
                "The credentials JSON needs client_id, client_secret, refresh_token and user_agent.",
            ),
            Self::ConfigFile { .. } => {
                Some("Run 'tendies config --init' to write a fresh default config file.")
            }
            Self::InvalidArgument { .. } => Some(
                "Pick categories with --stock-ticker, --due-diligence, --daily-discussion or --all.",
            ),
            Self::Api { .. } => Some("Check the refresh token and the subreddit name."),
            _ => None,
        }
    }
}

/// Extension trait for attaching a path to IO failures.
pub trait ResultExt<T> {
    /// Wrap an IO error with the operation and path it failed on.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped as [`TendiesError::PathError`].
    fn with_path(self, operation: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, operation: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| TendiesError::path_error(operation, path, e))
    }
}

// =============================================================================
// CLI Error Formatting Utilities
// =============================================================================

use colored::Colorize;

/// Render a fatal error for stderr:
///
/// ```text
/// tendies: Configuration problem
///   Ticker reference list not found at './nyse-listed.csv'
///   hint: Download the NYSE and NASDAQ listed symbol CSVs ...
/// ```
///
/// Multi-line details are indented line by line.
#[must_use]
pub fn format_error(title: &str, detail: &str, hint: Option<&str>) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "tendies:".red().bold(), title.bold());
    for line in detail.lines().filter(|l| !l.trim().is_empty()) {
        let _ = write!(output, "\n  {line}");
    }
    if let Some(hint) = hint {
        let _ = write!(output, "\n  {} {hint}", "hint:".cyan());
    }
    output
}

/// Format an error from the library for terminal display.
#[must_use]
pub fn format_tendies_error(err: &TendiesError) -> String {
    let title = if err.is_configuration() {
        "Configuration problem"
    } else if err.is_fetch() {
        "Fetch failed"
    } else {
        "Run failed"
    };
    format_error(title, &err.to_string(), err.suggestion())
}
