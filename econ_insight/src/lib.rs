//! # Econ Insight
//!
//! Turns the artifacts of an analysis run into a knowledge base of
//! interpreted facts and answers free-text questions about it.
//!
//! ```no_run
//! use econ_analysis::{CsvSeriesRepository, JsonFileStore};
//! use econ_analysis::store::ArtifactStore;
//! use econ_insight::{KnowledgeBaseBuilder, MetadataCatalog, QueryEngine};
//!
//! let repository = CsvSeriesRepository::from_path("observations.csv")?;
//! let bundle = JsonFileStore::new("bundle.json").load()?;
//! let knowledge = KnowledgeBaseBuilder::new(MetadataCatalog::default(), &bundle)
//!     .build(&repository)?;
//!
//! let record = QueryEngine::new(&knowledge).answer("How is inflation trending?");
//! println!("{}", record.answer);
//! # Ok::<(), econ_analysis::AnalysisError>(())
//! ```

pub mod interpret;
pub mod knowledge;
pub mod metadata;
pub mod query;

pub use crate::interpret::{EconomicContext, EmploymentOutlook, InflationOutlook};
pub use crate::knowledge::{
    analyze_trend, AnomalyInsight, CorrelationInsights, CurrentValue, ForecastSummary,
    KnowledgeBase, KnowledgeBaseBuilder, TrendDirection, TrendInsight,
};
pub use crate::metadata::{IndicatorRoles, MetadataCatalog, SeriesMetadata};
pub use crate::query::{classify, AnswerDetails, AnswerRecord, QueryCategory, QueryEngine};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
