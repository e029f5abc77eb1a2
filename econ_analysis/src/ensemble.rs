//! Two-model ensemble forecasting
//!
//! A trend-plus-seasonality model and an AIC-selected ARIMA model are fitted
//! independently and combined with fixed weights. Interval bounds are
//! combined with the same weights as the point forecasts, which is an
//! approximation rather than a calibrated interval.

use crate::config::{EnsembleWeights, ForecastConfig};
use crate::data::TimeSeries;
use crate::error::{AnalysisError, Result};
use crate::models::arima::ArimaOrder;
use crate::models::order_search::{CandidateResult, OrderSearch};
use crate::models::trend_seasonal::TrendSeasonalModel;
use crate::models::{ForecastModel, TrainedForecastModel};
use crate::utils::future_months;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One future period of an ensemble forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastStep {
    pub date: NaiveDate,
    /// Weighted point forecast
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
    /// Trend-plus-seasonality component
    pub trend_component: f64,
    pub trend_lower: f64,
    pub trend_upper: f64,
    /// ARIMA component
    pub arima_component: f64,
    pub arima_lower: f64,
    pub arima_upper: f64,
}

/// Forecast of one series over a monthly horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleForecast {
    pub series_id: String,
    /// Contiguous monthly steps starting one month after the last observation
    pub steps: Vec<ForecastStep>,
    pub arima_order: ArimaOrder,
    pub arima_aic: f64,
    pub weights: EnsembleWeights,
    /// Observations used for fitting
    pub training_points: usize,
    /// Outcome of every ARIMA candidate
    #[serde(default)]
    pub order_search: Vec<CandidateResult>,
}

impl EnsembleForecast {
    pub fn horizon(&self) -> usize {
        self.steps.len()
    }

    /// First step, if any
    pub fn next(&self) -> Option<&ForecastStep> {
        self.steps.first()
    }
}

/// Fits both models and combines them
#[derive(Debug, Clone, Default)]
pub struct EnsembleForecastEngine {
    config: ForecastConfig,
}

impl EnsembleForecastEngine {
    pub fn new(config: ForecastConfig) -> Result<Self> {
        config.weights.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast `horizon` monthly periods past the last observation
    pub fn forecast(&self, series: &TimeSeries, horizon: usize) -> Result<EnsembleForecast> {
        if horizon == 0 {
            return Err(AnalysisError::InvalidParameter(
                "Forecast horizon must be at least 1".to_string(),
            ));
        }
        series.require_len(self.config.min_observations)?;
        let last_date = series
            .last()
            .map(|p| p.date)
            .ok_or_else(|| AnalysisError::EmptyResult(series.series_id().to_string()))?;

        let trend = TrendSeasonalModel::new(self.config.trend.clone())
            .train(series)?
            .forecast(horizon)?;

        let search = OrderSearch::new(self.config.arima.clone()).search(series.series_id(), &series.values())?;
        let arima = search.best.forecast(horizon)?;

        let weights = self.config.weights;
        let dates = future_months(last_date, horizon)?;
        let steps: Vec<ForecastStep> = dates
            .into_iter()
            .enumerate()
            .map(|(h, date)| {
                let (trend_lower, trend_upper) = trend.intervals()[h];
                let (arima_lower, arima_upper) = arima.intervals()[h];
                let trend_component = trend.values()[h];
                let arima_component = arima.values()[h];
                ForecastStep {
                    date,
                    point: weights.combine(trend_component, arima_component),
                    lower: weights.combine(trend_lower, arima_lower),
                    upper: weights.combine(trend_upper, arima_upper),
                    trend_component,
                    trend_lower,
                    trend_upper,
                    arima_component,
                    arima_lower,
                    arima_upper,
                }
            })
            .collect();

        info!(
            "Forecast {} for {} periods using {} (trained on {} points)",
            series.series_id(),
            horizon,
            search.best.order(),
            series.len()
        );

        Ok(EnsembleForecast {
            series_id: series.series_id().to_string(),
            steps,
            arima_order: search.best.order(),
            arima_aic: search.best.aic(),
            weights,
            training_points: series.len(),
            order_search: search.trace,
        })
    }
}
