use std::path::PathBuf;
use thiserror::Error;

/// Boxed error carried by [`StatsError::Write`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors produced by the forwarding statistics pipeline.
#[derive(Error, Debug)]
pub enum StatsError {
    /// The requested date range is unparsable or has `start > end`.
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    /// The forwarding-history command could not be run for `window`.
    #[error("Forwarding source unavailable for {window}: {reason}")]
    SourceUnavailable { window: String, reason: String },

    /// The forwarding-history command answered with data we cannot parse.
    #[error("Malformed forwarding history for {window}: {source}")]
    MalformedOutput {
        window: String,
        #[source]
        source: serde_json::Error,
    },

    /// Aggregation was asked for a range whose start lies after its end.
    #[error("Empty aggregation range: {start} is after {end}")]
    EmptyRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    /// An output file or directory could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StatsError {
    /// Wrap any error raised while producing the file at `path`.
    pub fn write(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::Write {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Convenience alias used throughout the stats crates.
pub type Result<T> = std::result::Result<T, StatsError>;
