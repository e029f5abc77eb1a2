//! Batch analysis runs
//!
//! [`AnalysisRunner`] forecasts and scores every requested series in
//! parallel, computes correlations over the whole repository panel and
//! returns an [`AnalysisSession`]. Failures confined to one series are
//! recorded and the run carries on.

use crate::anomaly::{AnomalyDetector, AnomalyObservation, AnomalyReport};
use crate::config::AnalysisConfig;
use crate::correlation::{CorrelationEngine, CorrelationResult};
use crate::ensemble::{EnsembleForecast, EnsembleForecastEngine, ForecastStep};
use crate::error::{AnalysisError, Result};
use crate::repository::SeriesRepository;
use crate::store::ArtifactBundle;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Pipeline stage a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Load,
    Forecast,
    AnomalyDetection,
    Correlation,
}

/// A per-series failure that did not abort the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesFailure {
    pub series_id: String,
    pub stage: AnalysisStage,
    pub error: String,
}

/// Results of one run, passed explicitly to whoever consumes them
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    pub artifacts: ArtifactBundle,
    pub failures: Vec<SeriesFailure>,
}

/// Per-series overview combining the raw series with its artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub series_id: String,
    pub data_points: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub latest_value: f64,
    /// First steps of the ensemble forecast
    pub forecast: Option<Vec<ForecastStep>>,
    pub anomalies: Option<AnomalySummary>,
    /// Partner series from the ranked correlations with their coefficient
    pub correlated_series: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub total: usize,
    /// Flagged fraction of the cleaned window
    pub rate: f64,
    pub recent: Vec<AnomalyObservation>,
}

impl AnomalySummary {
    pub fn from_report(report: &AnomalyReport, recent: usize) -> Self {
        Self {
            total: report.anomaly_count(),
            rate: report.anomaly_rate(),
            recent: report
                .recent_anomalies(recent)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

const SUMMARY_FORECAST_STEPS: usize = 3;
const SUMMARY_RECENT_ANOMALIES: usize = 5;
const SUMMARY_PARTNERS: usize = 3;

impl AnalysisSession {
    pub fn new(artifacts: ArtifactBundle) -> Self {
        Self {
            artifacts,
            failures: Vec::new(),
        }
    }

    pub fn forecasts(&self) -> &BTreeMap<String, EnsembleForecast> {
        &self.artifacts.forecasts
    }

    pub fn anomalies(&self) -> &BTreeMap<String, AnomalyReport> {
        &self.artifacts.anomalies
    }

    pub fn correlations(&self) -> Option<&CorrelationResult> {
        self.artifacts.correlations.as_ref()
    }

    /// Summary of one series; artifacts that were not produced are `None`
    pub fn series_summary<R>(&self, series_id: &str, repository: &R) -> Result<SeriesSummary>
    where
        R: SeriesRepository + ?Sized,
    {
        let series = repository.get_series(series_id)?;
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(AnalysisError::EmptyResult(series_id.to_string()));
        };

        let forecast = self.artifacts.forecasts.get(series_id).map(|f| {
            f.steps
                .iter()
                .take(SUMMARY_FORECAST_STEPS)
                .cloned()
                .collect()
        });
        let anomalies = self
            .artifacts
            .anomalies
            .get(series_id)
            .map(|r| AnomalySummary::from_report(r, SUMMARY_RECENT_ANOMALIES));
        let correlated_series = self
            .correlations()
            .map(|c| {
                c.ranked
                    .iter()
                    .filter_map(|p| p.partner_of(series_id).map(|id| (id.to_string(), p.correlation)))
                    .take(SUMMARY_PARTNERS)
                    .collect()
            })
            .unwrap_or_default();

        Ok(SeriesSummary {
            series_id: series_id.to_string(),
            data_points: series.len(),
            start_date: first.date,
            end_date: last.date,
            latest_value: last.value,
            forecast,
            anomalies,
            correlated_series,
        })
    }
}

struct SeriesOutcome {
    series_id: String,
    forecast: Option<EnsembleForecast>,
    anomalies: Option<AnomalyReport>,
    failures: Vec<SeriesFailure>,
}

fn failure(series_id: &str, stage: AnalysisStage, error: &AnalysisError) -> SeriesFailure {
    warn!("{} failed during {:?}: {}", series_id, stage, error);
    SeriesFailure {
        series_id: series_id.to_string(),
        stage,
        error: error.to_string(),
    }
}

/// Runs forecasting, anomaly detection and correlation over a repository
#[derive(Debug, Clone)]
pub struct AnalysisRunner {
    config: AnalysisConfig,
    forecaster: EnsembleForecastEngine,
    detector: AnomalyDetector,
    correlations: CorrelationEngine,
}

impl AnalysisRunner {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            forecaster: EnsembleForecastEngine::new(config.forecast.clone())?,
            detector: AnomalyDetector::new(config.anomaly.clone()),
            correlations: CorrelationEngine::new(config.correlation.clone()),
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyse `series_ids`, or every known series when the slice is empty.
    ///
    /// Repository errors that are not specific to a series abort the run.
    pub fn run<R>(&self, repository: &R, series_ids: &[String]) -> Result<AnalysisSession>
    where
        R: SeriesRepository + ?Sized,
    {
        let ids = if series_ids.is_empty() {
            repository.series_ids()?
        } else {
            series_ids.to_vec()
        };
        info!("Analysing {} series", ids.len());

        let outcomes = ids
            .par_iter()
            .map(|id| self.analyse_series(repository, id))
            .collect::<Result<Vec<_>>>()?;

        let mut forecasts = BTreeMap::new();
        let mut anomalies = BTreeMap::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            if let Some(f) = outcome.forecast {
                forecasts.insert(outcome.series_id.clone(), f);
            }
            if let Some(a) = outcome.anomalies {
                anomalies.insert(outcome.series_id.clone(), a);
            }
            failures.extend(outcome.failures);
        }

        let correlations = match repository
            .get_all_series_panel()
            .and_then(|panel| self.correlations.compute_correlations(&panel))
        {
            Ok(result) => Some(result),
            Err(AnalysisError::EmptyPanel) => {
                failures.push(failure("*", AnalysisStage::Correlation, &AnalysisError::EmptyPanel));
                None
            }
            Err(e) => return Err(e),
        };

        info!(
            "Run finished: {} forecasts, {} anomaly reports, {} failures",
            forecasts.len(),
            anomalies.len(),
            failures.len()
        );

        Ok(AnalysisSession {
            artifacts: ArtifactBundle::new(forecasts, anomalies, correlations),
            failures,
        })
    }

    fn analyse_series<R>(&self, repository: &R, series_id: &str) -> Result<SeriesOutcome>
    where
        R: SeriesRepository + ?Sized,
    {
        let mut outcome = SeriesOutcome {
            series_id: series_id.to_string(),
            forecast: None,
            anomalies: None,
            failures: Vec::new(),
        };

        let series = match repository.get_series(series_id) {
            Ok(series) => series,
            Err(e) if e.is_series_local() => {
                outcome.failures.push(failure(series_id, AnalysisStage::Load, &e));
                return Ok(outcome);
            }
            Err(e) => return Err(e),
        };

        match self.forecaster.forecast(&series, self.config.forecast.horizon) {
            Ok(f) => outcome.forecast = Some(f),
            Err(e) if e.is_series_local() => {
                outcome.failures.push(failure(series_id, AnalysisStage::Forecast, &e))
            }
            Err(e) => return Err(e),
        }

        match self.detector.detect(&series) {
            Ok(a) => outcome.anomalies = Some(a),
            Err(e) if e.is_series_local() => {
                outcome
                    .failures
                    .push(failure(series_id, AnalysisStage::AnomalyDetection, &e))
            }
            Err(e) => return Err(e),
        }

        Ok(outcome)
    }
}
