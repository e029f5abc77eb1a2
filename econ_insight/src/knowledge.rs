//! Knowledge base synthesis
//!
//! A [`KnowledgeBase`] is rebuilt wholesale from an [`ArtifactBundle`] and a
//! fresh read of the repository. It holds plain facts (current values,
//! forecast summaries, trends, correlation buckets and anomaly summaries)
//! plus the [`EconomicContext`] derived from them.

use crate::interpret::{ContextInputs, EconomicContext};
use crate::metadata::MetadataCatalog;
use chrono::NaiveDate;
use econ_analysis::correlation::CorrelationStrength;
use econ_analysis::{
    AnalysisError, AnomalyReport, ArimaOrder, ArtifactBundle, CorrelationPair, CorrelationResult,
    EnsembleForecast, Result, SeriesRepository,
};
use econ_math::stats::{mean, population_std_dev};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Trailing observations a trend is measured over
pub const TREND_WINDOW: usize = 12;
/// Observations averaged at each end of the trend window
const TREND_EDGE: usize = 3;
const FORECAST_SUMMARY_STEPS: usize = 3;
const CORRELATION_INSIGHT_PAIRS: usize = 10;
const RECENT_ANOMALIES: usize = 5;

/// Latest observation of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentValue {
    pub date: NaiveDate,
    pub value: f64,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalBounds {
    pub lower: f64,
    pub upper: f64,
}

/// The first few ensemble steps, split into parallel columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub dates: Vec<NaiveDate>,
    pub next_3_months: Vec<f64>,
    pub confidence_intervals: Vec<IntervalBounds>,
    pub trend_component: Vec<f64>,
    pub arima_component: Vec<f64>,
    pub arima_order: ArimaOrder,
}

impl ForecastSummary {
    pub fn from_forecast(forecast: &EnsembleForecast) -> Self {
        let steps = &forecast.steps[..forecast.steps.len().min(FORECAST_SUMMARY_STEPS)];
        Self {
            dates: steps.iter().map(|s| s.date).collect(),
            next_3_months: steps.iter().map(|s| s.point).collect(),
            confidence_intervals: steps
                .iter()
                .map(|s| IntervalBounds {
                    lower: s.lower,
                    upper: s.upper,
                })
                .collect(),
            trend_component: steps.iter().map(|s| s.trend_component).collect(),
            arima_component: steps.iter().map(|s| s.arima_component).collect(),
            arima_order: forecast.arima_order,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Increasing => f.write_str("increasing"),
            TrendDirection::Decreasing => f.write_str("decreasing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendInsight {
    pub direction: TrendDirection,
    /// |recent - earlier| / earlier, in percent; negative when the base is
    /// negative
    pub magnitude_percent: f64,
    /// Coefficient of variation of the window, in percent
    pub volatility_percent: f64,
    pub recent_average: f64,
    pub year_ago_average: f64,
}

/// Trend over the trailing [`TREND_WINDOW`] values.
///
/// Compares the mean of the last three values against the mean of the first
/// three. Returns `None` for shorter input or when a ratio is undefined.
pub fn analyze_trend(values: &[f64]) -> Option<TrendInsight> {
    if values.len() < TREND_WINDOW {
        return None;
    }
    let window = &values[values.len() - TREND_WINDOW..];
    let earlier = mean(&window[..TREND_EDGE])?;
    let recent = mean(&window[TREND_WINDOW - TREND_EDGE..])?;
    if earlier == 0.0 {
        return None;
    }

    let magnitude_percent = (recent - earlier).abs() / earlier * 100.0;
    let volatility_percent = population_std_dev(window)? / mean(window)? * 100.0;
    if !magnitude_percent.is_finite() || !volatility_percent.is_finite() {
        return None;
    }

    Some(TrendInsight {
        direction: if recent > earlier {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        },
        magnitude_percent,
        volatility_percent,
        recent_average: recent,
        year_ago_average: earlier,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationInsight {
    pub series_a: String,
    pub series_b: String,
    pub correlation: f64,
    pub relationship: Relationship,
}

impl From<&CorrelationPair> for CorrelationInsight {
    fn from(pair: &CorrelationPair) -> Self {
        Self {
            series_a: pair.series_a.clone(),
            series_b: pair.series_b.clone(),
            correlation: pair.correlation,
            relationship: if pair.correlation >= 0.0 {
                Relationship::Positive
            } else {
                Relationship::Negative
            },
        }
    }
}

/// Top-ranked pairs split by strength; weak pairs are dropped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationInsights {
    pub strong: Vec<CorrelationInsight>,
    pub moderate: Vec<CorrelationInsight>,
}

impl CorrelationInsights {
    pub fn from_result(result: &CorrelationResult) -> Self {
        let mut insights = Self::default();
        for pair in result.ranked.iter().take(CORRELATION_INSIGHT_PAIRS) {
            match pair.strength() {
                CorrelationStrength::Strong => insights.strong.push(pair.into()),
                CorrelationStrength::Moderate => insights.moderate.push(pair.into()),
                CorrelationStrength::Weak => {}
            }
        }
        insights
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyInsight {
    pub total_anomalies: usize,
    pub anomaly_rate_percent: f64,
    /// Most recent flagged observations, oldest first
    pub recent_anomaly_dates: Vec<NaiveDate>,
    pub recent_anomaly_values: Vec<f64>,
}

impl AnomalyInsight {
    pub fn from_report(report: &AnomalyReport) -> Self {
        let recent = report.recent_anomalies(RECENT_ANOMALIES);
        Self {
            total_anomalies: report.anomaly_count(),
            anomaly_rate_percent: report.anomaly_rate() * 100.0,
            recent_anomaly_dates: recent.iter().map(|o| o.date).collect(),
            recent_anomaly_values: recent.iter().map(|o| o.value).collect(),
        }
    }
}

/// Read-only facts and outlooks the query layer answers from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeBase {
    pub current_data: BTreeMap<String, CurrentValue>,
    pub forecasts: BTreeMap<String, ForecastSummary>,
    pub trends: BTreeMap<String, TrendInsight>,
    /// `None` when the run produced no correlations
    pub correlations: Option<CorrelationInsights>,
    pub anomalies: BTreeMap<String, AnomalyInsight>,
    pub economic_context: EconomicContext,
    #[serde(skip)]
    pub catalog: MetadataCatalog,
}

/// Assembles a [`KnowledgeBase`] from saved artifacts and a repository
pub struct KnowledgeBaseBuilder<'a> {
    catalog: MetadataCatalog,
    artifacts: &'a ArtifactBundle,
}

impl<'a> KnowledgeBaseBuilder<'a> {
    pub fn new(catalog: MetadataCatalog, artifacts: &'a ArtifactBundle) -> Self {
        Self { catalog, artifacts }
    }

    /// Build the knowledge base.
    ///
    /// Repository failures that are not confined to one series propagate;
    /// a series without a computable trend is simply left out of `trends`.
    pub fn build<R>(self, repository: &R) -> Result<KnowledgeBase>
    where
        R: SeriesRepository + ?Sized,
    {
        let current_data: BTreeMap<String, CurrentValue> = repository
            .current_values()?
            .into_iter()
            .map(|(id, obs)| {
                let category = self.catalog.get(&id).map(|m| m.category.clone());
                (
                    id,
                    CurrentValue {
                        date: obs.date,
                        value: obs.value,
                        category,
                    },
                )
            })
            .collect();

        let mut trends = BTreeMap::new();
        for id in repository.series_ids()? {
            let series = match repository.get_series(&id) {
                Ok(series) => series,
                Err(e) if e.is_series_local() => {
                    debug!("No trend for {}: {}", id, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            match analyze_trend(&series.values()) {
                Some(trend) => {
                    trends.insert(id, trend);
                }
                None => debug!(
                    "No trend for {}: fewer than {} usable observations",
                    id, TREND_WINDOW
                ),
            }
        }

        let forecasts: BTreeMap<String, ForecastSummary> = self
            .artifacts
            .forecasts
            .iter()
            .map(|(id, f)| (id.clone(), ForecastSummary::from_forecast(f)))
            .collect();

        let correlations = match self.artifacts.correlation_result() {
            Ok(result) => Some(CorrelationInsights::from_result(result)),
            Err(AnalysisError::MissingArtifact(_)) => {
                debug!("No correlation artifact in bundle");
                None
            }
            Err(e) => return Err(e),
        };

        let anomalies: BTreeMap<String, AnomalyInsight> = self
            .artifacts
            .anomalies
            .iter()
            .map(|(id, report)| (id.clone(), AnomalyInsight::from_report(report)))
            .collect();

        let economic_context = EconomicContext::derive(&ContextInputs {
            current: &current_data,
            forecasts: &forecasts,
            trends: &trends,
            anomalies: &anomalies,
            catalog: &self.catalog,
        });

        info!(
            "Knowledge base built: {} current values, {} forecasts, {} trends, {} anomaly summaries",
            current_data.len(),
            forecasts.len(),
            trends.len(),
            anomalies.len()
        );

        Ok(KnowledgeBase {
            current_data,
            forecasts,
            trends,
            correlations,
            anomalies,
            economic_context,
            catalog: self.catalog,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_increasing_trend_magnitude() {
        let values = [
            100.0, 100.0, 100.0, 101.0, 102.0, 103.0, 104.0, 105.0, 106.0, 110.0, 110.0, 110.0,
        ];
        let trend = analyze_trend(&values).unwrap();
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert_relative_eq!(trend.magnitude_percent, 10.0, epsilon = 1e-9);
        assert_relative_eq!(trend.year_ago_average, 100.0);
        assert_relative_eq!(trend.recent_average, 110.0);
    }

    #[test]
    fn test_trend_uses_trailing_window() {
        let mut values = vec![1_000.0; 5];
        values.extend([8.0, 8.0, 8.0, 7.0, 7.0, 7.0, 6.0, 6.0, 6.0, 4.0, 4.0, 4.0]);
        let trend = analyze_trend(&values).unwrap();
        assert_eq!(trend.direction, TrendDirection::Decreasing);
        assert_relative_eq!(trend.magnitude_percent, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_flat_trend_is_decreasing() {
        let trend = analyze_trend(&[5.0; 12]).unwrap();
        assert_eq!(trend.direction, TrendDirection::Decreasing);
        assert_relative_eq!(trend.magnitude_percent, 0.0);
        assert_relative_eq!(trend.volatility_percent, 0.0);
    }

    #[test]
    fn test_negative_base_keeps_its_sign() {
        let mut values = vec![-10.0; 3];
        values.extend([-5.0; 9]);
        let trend = analyze_trend(&values).unwrap();
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert_relative_eq!(trend.magnitude_percent, -50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_trend_requires_twelve_points() {
        assert!(analyze_trend(&[1.0; 11]).is_none());
    }

    #[test]
    fn test_trend_zero_base_is_undefined() {
        let mut values = vec![0.0; 3];
        values.extend([1.0; 9]);
        assert!(analyze_trend(&values).is_none());
    }

    #[test]
    fn test_correlation_relationship_sign() {
        let pair = CorrelationPair {
            series_a: "PAYEMS".to_string(),
            series_b: "UNRATE".to_string(),
            correlation: -0.9,
            overlap: 36,
        };
        let insight = CorrelationInsight::from(&pair);
        assert_eq!(insight.relationship, Relationship::Negative);
    }
}
