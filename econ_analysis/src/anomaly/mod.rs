//! Per-series anomaly detection

pub mod features;
pub mod isolation_forest;

use crate::config::AnomalyConfig;
use crate::data::TimeSeries;
use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use econ_math::stats::{percentile_linear, standardize_columns};
use features::engineer_features;
use isolation_forest::IsolationForest;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Verdict for one observation of the cleaned feature window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyObservation {
    pub date: NaiveDate,
    pub value: f64,
    pub is_anomaly: bool,
    /// Lower is more anomalous
    pub score: f64,
}

/// Anomaly verdicts for one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub series_id: String,
    /// One entry per row that survived feature engineering
    pub observations: Vec<AnomalyObservation>,
    pub contamination: f64,
    /// Scores strictly below this value are flagged
    pub threshold: f64,
}

impl AnomalyReport {
    pub fn anomaly_count(&self) -> usize {
        self.observations.iter().filter(|o| o.is_anomaly).count()
    }

    /// Flagged fraction of the cleaned window
    pub fn anomaly_rate(&self) -> f64 {
        if self.observations.is_empty() {
            return 0.0;
        }
        self.anomaly_count() as f64 / self.observations.len() as f64
    }

    /// The last `k` flagged observations, oldest first
    pub fn recent_anomalies(&self, k: usize) -> Vec<&AnomalyObservation> {
        let flagged: Vec<&AnomalyObservation> =
            self.observations.iter().filter(|o| o.is_anomaly).collect();
        flagged[flagged.len().saturating_sub(k)..].to_vec()
    }
}

/// Isolation-forest detector over engineered features
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    /// Detect with the configured contamination
    pub fn detect(&self, series: &TimeSeries) -> Result<AnomalyReport> {
        self.detect_with_contamination(series, self.config.contamination)
    }

    pub fn detect_with_contamination(
        &self,
        series: &TimeSeries,
        contamination: f64,
    ) -> Result<AnomalyReport> {
        if !(contamination > 0.0 && contamination <= 0.5) {
            return Err(AnalysisError::InvalidParameter(format!(
                "Contamination must lie in (0, 0.5], got {}",
                contamination
            )));
        }
        series.require_len(self.config.min_observations)?;

        let rows = engineer_features(series)?;
        if rows.len() < self.config.min_clean_rows {
            return Err(AnalysisError::InsufficientData {
                series_id: series.series_id().to_string(),
                required: self.config.min_clean_rows,
                actual: rows.len(),
            });
        }

        let matrix: Vec<Vec<f64>> = rows.iter().map(|r| r.features.to_vec()).collect();
        let scaled = standardize_columns(&matrix)?;
        let forest = IsolationForest::new(self.config.n_trees, self.config.max_samples, self.config.seed)?
            .fit(&scaled)?;
        let scores = forest.score_samples(&scaled);
        let threshold = percentile_linear(&scores, 100.0 * contamination)?;

        let observations: Vec<AnomalyObservation> = rows
            .iter()
            .zip(scores)
            .map(|(row, score)| AnomalyObservation {
                date: row.date,
                value: row.value,
                is_anomaly: score < threshold,
                score,
            })
            .collect();

        let report = AnomalyReport {
            series_id: series.series_id().to_string(),
            observations,
            contamination,
            threshold,
        };
        info!(
            "{}: {} anomalies in {} observations",
            report.series_id,
            report.anomaly_count(),
            report.observations.len()
        );
        Ok(report)
    }
}
