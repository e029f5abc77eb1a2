//! Error types for the econ_analysis crate

use econ_math::MathError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the econ_analysis crate
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The repository holds no rows for the requested series
    #[error("Series not found: {0}")]
    SeriesNotFound(String),

    /// The repository answered but returned zero observations
    #[error("Empty result for series {0}")]
    EmptyResult(String),

    /// A panel with no series or no dates was supplied
    #[error("Panel contains no data")]
    EmptyPanel,

    /// Below the minimum observation count for an operation
    #[error("Insufficient data for {series_id}: need at least {required} observations, have {actual}")]
    InsufficientData {
        series_id: String,
        required: usize,
        actual: usize,
    },

    /// No autoregressive order converged
    #[error("Model fit failure: {0}")]
    ModelFitFailure(String),

    /// An interpretation asked for an artifact that has not been produced
    #[error("Missing artifact: {0}")]
    MissingArtifact(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Failure reported by an external series store
    #[error("Repository error: {message}")]
    Repository { message: String, retryable: bool },

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from JSON encoding or decoding
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from numeric routines
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Configuration could not be read or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AnalysisError {
    /// Whether retrying the same external call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalysisError::Repository { retryable, .. } => *retryable,
            AnalysisError::IoError(_) => true,
            _ => false,
        }
    }

    /// Whether the error concerns only one series and should not abort a batch
    pub fn is_series_local(&self) -> bool {
        matches!(
            self,
            AnalysisError::SeriesNotFound(_)
                | AnalysisError::EmptyResult(_)
                | AnalysisError::InsufficientData { .. }
                | AnalysisError::ModelFitFailure(_)
                | AnalysisError::DataError(_)
                | AnalysisError::Math(_)
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, AnalysisError>;

impl From<PolarsError> for AnalysisError {
    fn from(err: PolarsError) -> Self {
        AnalysisError::PolarsError(err.to_string())
    }
}

impl From<toml::de::Error> for AnalysisError {
    fn from(err: toml::de::Error) -> Self {
        AnalysisError::Config(err.to_string())
    }
}
