//! # Econ Analysis
//!
//! Statistical engines for monthly economic indicators.
//!
//! ## Features
//!
//! - Date-ordered series and date-aligned panels (polars backed)
//! - Repository contract with in-memory, CSV and retrying implementations
//! - Ensemble forecasting: trend-plus-seasonality and AIC-selected ARIMA
//! - Isolation-forest anomaly detection over engineered features
//! - Pairwise correlation discovery with ranking
//! - Batch runs with per-series failure isolation and versioned artifact bundles
//!
//! ## Quick Start
//!
//! ```no_run
//! use econ_analysis::{AnalysisConfig, AnalysisRunner, CsvSeriesRepository, JsonFileStore};
//! use econ_analysis::store::ArtifactStore;
//!
//! let repository = CsvSeriesRepository::from_path("observations.csv")?;
//! let runner = AnalysisRunner::new(AnalysisConfig::default())?;
//! let session = runner.run(&repository, &[])?;
//!
//! for failure in &session.failures {
//!     eprintln!("{} skipped: {}", failure.series_id, failure.error);
//! }
//! JsonFileStore::new("bundle.json").save(&session.artifacts)?;
//! # Ok::<(), econ_analysis::AnalysisError>(())
//! ```

pub mod anomaly;
pub mod config;
pub mod correlation;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod models;
pub mod repository;
pub mod session;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use crate::anomaly::{AnomalyDetector, AnomalyObservation, AnomalyReport};
pub use crate::config::{AnalysisConfig, EnsembleWeights};
pub use crate::correlation::{
    CorrelationEngine, CorrelationMatrix, CorrelationPair, CorrelationResult, CorrelationStrength,
};
pub use crate::data::{SeriesPanel, TimeSeries, TimeSeriesPoint};
pub use crate::ensemble::{EnsembleForecast, EnsembleForecastEngine, ForecastStep};
pub use crate::error::{AnalysisError, Result};
pub use crate::models::arima::ArimaOrder;
pub use crate::repository::{
    CsvSeriesRepository, CurrentObservation, InMemorySeriesRepository, RetryingRepository,
    SeriesRepository,
};
pub use crate::session::{AnalysisRunner, AnalysisSession, SeriesFailure, SeriesSummary};
pub use crate::store::{ArtifactBundle, ArtifactStore, JsonFileStore, MemoryStore};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
