//! Forecasting models for monthly indicator series

use crate::data::TimeSeries;
use crate::error::{AnalysisError, Result};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt::Debug;

/// Point forecasts of one model with per-step interval bounds
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    /// Forecasted values
    values: Vec<f64>,
    /// Lower and upper interval bound per step
    intervals: Vec<(f64, f64)>,
}

impl ForecastResult {
    /// Create a forecast result with prediction intervals
    pub fn new_with_intervals(values: Vec<f64>, intervals: Vec<(f64, f64)>) -> Result<Self> {
        if values.len() != intervals.len() {
            return Err(AnalysisError::InvalidParameter(format!(
                "Values length ({}) doesn't match intervals length ({})",
                values.len(),
                intervals.len()
            )));
        }
        if values
            .iter()
            .chain(intervals.iter().flat_map(|(l, u)| [l, u]))
            .any(|v| !v.is_finite())
        {
            return Err(AnalysisError::ModelFitFailure(
                "Forecast contains non-finite values".to_string(),
            ));
        }

        Ok(Self { values, intervals })
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the prediction intervals
    pub fn intervals(&self) -> &[(f64, f64)] {
        &self.intervals
    }

    /// Number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.values.len()
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug + Send + Sync {
    /// Generate forecast for future periods
    fn forecast(&self, horizons: usize) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> String;
}

/// Forecast model that can be trained on a series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a series
    fn train(&self, series: &TimeSeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Two-sided standard normal quantile for a central interval of `level`
pub(crate) fn normal_quantile(level: f64) -> Result<f64> {
    if !(level > 0.0 && level < 1.0) {
        return Err(AnalysisError::InvalidParameter(format!(
            "Interval level must be between 0 and 1, got {}",
            level
        )));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AnalysisError::InvalidParameter(e.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + level / 2.0))
}

pub mod arima;
pub mod order_search;
pub mod trend_seasonal;
