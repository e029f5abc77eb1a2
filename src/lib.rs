//! # Econ Intel
//!
//! Economic-indicator intelligence: ensemble forecasting, anomaly detection,
//! correlation discovery and question answering over monthly series.
//!
//! The work is split across three crates, re-exported here:
//!
//! - [`math`]: numeric helpers (statistics, rolling features, solvers)
//! - [`analysis`]: series data model, repositories, the analysis engines and
//!   batch runs
//! - [`insight`]: knowledge base synthesis and the query engine

pub use econ_analysis as analysis;
pub use econ_insight as insight;
pub use econ_math as math;

#[cfg(test)]
mod tests {
    #[test]
    fn test_crates_are_reachable() {
        assert_eq!(super::insight::VERSION, super::analysis::VERSION);
        assert_eq!(super::math::stats::mean(&[1.0, 3.0]), Some(2.0));
    }
}
