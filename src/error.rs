//! Error kinds raised by synthesis and aggregation.

use thiserror::Error;

/// Errors raised while synthesizing loadshapes or aggregating monitor output.
///
/// Every variant is raised at the point of detection. Nothing here is retried:
/// the pipeline is a pure function of its inputs.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Invalid phase/connection encoding, unknown profile key, or degenerate input.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Missing channel in monitor output or a malformed column name.
    #[error("data error: {0}")]
    Data(String),
    /// The number of allocated seeds does not match the number of entities.
    #[error("reproducibility error: {entities} entities but {seeds} seeds")]
    Reproducibility { entities: usize, seeds: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SynthError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn data(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SynthError>;
