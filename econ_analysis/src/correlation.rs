//! Pairwise Pearson correlation across a series panel

use crate::config::CorrelationConfig;
use crate::data::SeriesPanel;
use crate::error::{AnalysisError, Result};
use econ_math::stats::pearson;
use serde::{Deserialize, Serialize};
use tracing::info;

/// |r| above this is strong
pub const STRONG_THRESHOLD: f64 = 0.8;
/// |r| above this (and not strong) is moderate
pub const MODERATE_THRESHOLD: f64 = 0.5;

/// Interpretation bucket of a correlation coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
}

impl CorrelationStrength {
    pub fn classify(r: f64) -> Self {
        let magnitude = r.abs();
        if magnitude > STRONG_THRESHOLD {
            CorrelationStrength::Strong
        } else if magnitude > MODERATE_THRESHOLD {
            CorrelationStrength::Moderate
        } else {
            CorrelationStrength::Weak
        }
    }
}

/// Symmetric matrix of pairwise correlations, absent where undefined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub series_ids: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Correlation between two series, `None` if unknown or undefined
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.series_ids.iter().position(|id| id == a)?;
        let j = self.series_ids.iter().position(|id| id == b)?;
        self.values[i][j]
    }
}

/// One unordered pair with a defined correlation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub series_a: String,
    pub series_b: String,
    pub correlation: f64,
    /// Observations present in both series
    pub overlap: usize,
}

impl CorrelationPair {
    pub fn strength(&self) -> CorrelationStrength {
        CorrelationStrength::classify(self.correlation)
    }

    /// The other member of the pair, if `series_id` is one of them
    pub fn partner_of(&self, series_id: &str) -> Option<&str> {
        if self.series_a == series_id {
            Some(&self.series_b)
        } else if self.series_b == series_id {
            Some(&self.series_a)
        } else {
            None
        }
    }
}

/// Matrix plus the top-ranked pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub matrix: CorrelationMatrix,
    /// Sorted by |r| descending
    pub ranked: Vec<CorrelationPair>,
}

#[derive(Debug, Clone, Default)]
pub struct CorrelationEngine {
    config: CorrelationConfig,
}

impl CorrelationEngine {
    pub fn new(config: CorrelationConfig) -> Self {
        Self { config }
    }

    pub fn compute_correlations(&self, panel: &SeriesPanel) -> Result<CorrelationResult> {
        if panel.is_empty() {
            return Err(AnalysisError::EmptyPanel);
        }

        let ids = panel.series_ids().to_vec();
        let columns = ids
            .iter()
            .map(|id| panel.column(id))
            .collect::<Result<Vec<_>>>()?;

        let k = ids.len();
        let mut values = vec![vec![None; k]; k];
        let mut pairs = Vec::new();
        for i in 0..k {
            values[i][i] = Some(1.0);
            for j in (i + 1)..k {
                let (x, y): (Vec<f64>, Vec<f64>) = columns[i]
                    .iter()
                    .zip(columns[j].iter())
                    .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                    .unzip();
                if x.len() < self.config.min_overlap {
                    continue;
                }
                if let Some(r) = pearson(&x, &y) {
                    values[i][j] = Some(r);
                    values[j][i] = Some(r);
                    pairs.push(CorrelationPair {
                        series_a: ids[i].clone(),
                        series_b: ids[j].clone(),
                        correlation: r,
                        overlap: x.len(),
                    });
                }
            }
        }

        // stable sort keeps panel order among equal magnitudes
        pairs.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
        pairs.truncate(self.config.top_k);

        info!("Computed correlations for {} series, {} ranked pairs", k, pairs.len());

        Ok(CorrelationResult {
            matrix: CorrelationMatrix {
                series_ids: ids,
                values,
            },
            ranked: pairs,
        })
    }
}
