//! # Econ Math
//!
//! Numeric building blocks for economic indicator analysis.
//! This crate provides the descriptive statistics, feature-engineering
//! windows, least-squares solver and derivative-free optimiser used by the
//! forecasting and anomaly-detection engines.

use thiserror::Error;

pub mod linalg;
pub mod optimize;
pub mod polynomial;
pub mod rolling;
pub mod stats;

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Singular system: {0}")]
    SingularMatrix(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;
