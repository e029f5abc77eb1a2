//! Piecewise-linear trend with additive yearly seasonality
//!
//! The model is `y(t) = k + m*t + sum(delta_j * (t - s_j)_+) + s(t)` where the
//! `s_j` are potential changepoints spread over the early part of the history
//! and `s(t)` is a Fourier series with a 365.25 day period. Changepoint rate
//! adjustments and seasonal coefficients get Gaussian priors, so the fit is a
//! ridge regression on a scaled copy of the data.

use crate::config::TrendSeasonalConfig;
use crate::data::TimeSeries;
use crate::error::{AnalysisError, Result};
use crate::models::{normal_quantile, ForecastModel, ForecastResult, TrainedForecastModel};
use crate::utils::future_months;
use chrono::{Datelike, NaiveDate};
use econ_math::linalg::{residual_sum_of_squares, ridge_least_squares};
use std::f64::consts::PI;
use tracing::debug;

const YEAR_DAYS: f64 = 365.25;
/// Floor for every penalty so the normal equations stay well conditioned
const MIN_PENALTY: f64 = 1e-6;
const MIN_VARIANCE: f64 = 1e-12;

/// Trend-plus-seasonality model
#[derive(Debug, Clone)]
pub struct TrendSeasonalModel {
    name: String,
    config: TrendSeasonalConfig,
}

/// Fitted trend-plus-seasonality model
#[derive(Debug, Clone)]
pub struct TrainedTrendSeasonal {
    name: String,
    fourier_order: usize,
    interval_width: f64,
    first_day: f64,
    span_days: f64,
    y_scale: f64,
    /// Changepoint locations on the scaled time axis
    changepoints: Vec<f64>,
    coefficients: Vec<f64>,
    /// Residual standard deviation on the original scale
    sigma: f64,
    n_train: usize,
    last_date: NaiveDate,
}

impl TrendSeasonalModel {
    pub fn new(config: TrendSeasonalConfig) -> Self {
        Self {
            name: "TrendSeasonal".to_string(),
            config,
        }
    }
}

impl Default for TrendSeasonalModel {
    fn default() -> Self {
        Self::new(TrendSeasonalConfig::default())
    }
}

fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn design_row(t: f64, day: f64, changepoints: &[f64], fourier_order: usize) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + changepoints.len() + 2 * fourier_order);
    row.push(1.0);
    row.push(t);
    row.extend(changepoints.iter().map(|&s| (t - s).max(0.0)));
    for k in 1..=fourier_order {
        let angle = 2.0 * PI * k as f64 * day / YEAR_DAYS;
        row.push(angle.sin());
        row.push(angle.cos());
    }
    row
}

fn penalties(n_changepoints: usize, fourier_order: usize, cp: f64, seasonal: f64) -> Vec<f64> {
    let mut out = vec![MIN_PENALTY, MIN_PENALTY];
    out.extend(std::iter::repeat(cp.max(MIN_PENALTY)).take(n_changepoints));
    out.extend(std::iter::repeat(seasonal.max(MIN_PENALTY)).take(2 * fourier_order));
    out
}

impl ForecastModel for TrendSeasonalModel {
    type Trained = TrainedTrendSeasonal;

    fn train(&self, series: &TimeSeries) -> Result<TrainedTrendSeasonal> {
        series.require_len(3)?;
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(AnalysisError::EmptyResult(series.series_id().to_string()));
        };

        let first_day = day_number(first.date);
        let span_days = day_number(last.date) - first_day;
        let values = series.values();
        let n = values.len();

        let y_scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let y: Vec<f64> = values.iter().map(|v| v / y_scale).collect();

        let days: Vec<f64> = series.dates().into_iter().map(day_number).collect();
        let t: Vec<f64> = days.iter().map(|d| (d - first_day) / span_days).collect();

        let history = (self.config.changepoint_range * n as f64).floor() as usize;
        let n_changepoints = self.config.n_changepoints.min(history.saturating_sub(1));
        let changepoints: Vec<f64> = (1..=n_changepoints)
            .map(|k| {
                let idx = (k as f64 * (history - 1) as f64 / n_changepoints as f64).round() as usize;
                t[idx.min(n - 1)]
            })
            .collect();

        let order = self.config.yearly_fourier_order;
        let design: Vec<Vec<f64>> = t
            .iter()
            .zip(days.iter())
            .map(|(&ti, &day)| design_row(ti, day, &changepoints, order))
            .collect();

        // Pass 1: loose priors, only to estimate the noise level
        let pilot = ridge_least_squares(&design, &y, &penalties(n_changepoints, order, 1.0, 1e-4))?;
        let pilot_variance =
            (residual_sum_of_squares(&design, &y, &pilot) / n as f64).max(MIN_VARIANCE);

        let cp_penalty = pilot_variance / self.config.changepoint_prior_scale.powi(2);
        let seasonal_penalty = pilot_variance / self.config.seasonality_prior_scale.powi(2);
        let coefficients = ridge_least_squares(
            &design,
            &y,
            &penalties(n_changepoints, order, cp_penalty, seasonal_penalty),
        )?;
        let sigma = (residual_sum_of_squares(&design, &y, &coefficients) / n as f64).sqrt() * y_scale;

        debug!(
            "{}: {} changepoints, residual sigma {:.6}",
            series.series_id(),
            n_changepoints,
            sigma
        );

        Ok(TrainedTrendSeasonal {
            name: self.name.clone(),
            fourier_order: order,
            interval_width: self.config.interval_width,
            first_day,
            span_days,
            y_scale,
            changepoints,
            coefficients,
            sigma,
            n_train: n,
            last_date: last.date,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedTrendSeasonal {
    /// Fitted value at an arbitrary date
    pub fn predict_at(&self, date: NaiveDate) -> f64 {
        let day = day_number(date);
        let t = (day - self.first_day) / self.span_days;
        let row = design_row(t, day, &self.changepoints, self.fourier_order);
        let scaled: f64 = row.iter().zip(&self.coefficients).map(|(x, b)| x * b).sum();
        scaled * self.y_scale
    }

    /// Residual standard deviation of the fit
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl TrainedForecastModel for TrainedTrendSeasonal {
    fn forecast(&self, horizons: usize) -> Result<ForecastResult> {
        let z = normal_quantile(self.interval_width)?;
        let dates = future_months(self.last_date, horizons)?;

        let mut values = Vec::with_capacity(horizons);
        let mut intervals = Vec::with_capacity(horizons);
        for (h, date) in dates.into_iter().enumerate() {
            let point = self.predict_at(date);
            let half_width = z * self.sigma * (1.0 + (h + 1) as f64 / self.n_train as f64).sqrt();
            values.push(point);
            intervals.push((point - half_width, point + half_width));
        }

        ForecastResult::new_with_intervals(values, intervals)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn monthly(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let pairs: Vec<(NaiveDate, f64)> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (start.checked_add_months(chrono::Months::new(i as u32)).unwrap(), v))
            .collect();
        TimeSeries::from_pairs("TEST", &pairs).unwrap()
    }

    #[test]
    fn test_linear_series_is_extrapolated() {
        let values: Vec<f64> = (0..36).map(|i| 100.0 + 2.0 * i as f64).collect();
        let trained = TrendSeasonalModel::default().train(&monthly(&values)).unwrap();
        let forecast = trained.forecast(3).unwrap();

        assert_eq!(forecast.horizons(), 3);
        for (h, value) in forecast.values().iter().enumerate() {
            let expected = 100.0 + 2.0 * (36 + h) as f64;
            assert_relative_eq!(*value, expected, epsilon = 1.0);
        }
    }

    #[test]
    fn test_intervals_widen_with_horizon() {
        let values: Vec<f64> = (0..36)
            .map(|i| 50.0 + 0.3 * i as f64 + ((i * 7) % 5) as f64 * 0.4)
            .collect();
        let trained = TrendSeasonalModel::default().train(&monthly(&values)).unwrap();
        let forecast = trained.forecast(6).unwrap();

        let widths: Vec<f64> = forecast.intervals().iter().map(|(l, u)| u - l).collect();
        for (i, (low, high)) in forecast.intervals().iter().enumerate() {
            assert!(low <= &forecast.values()[i] && &forecast.values()[i] <= high);
        }
        assert!(widths.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_seasonal_pattern_is_captured() {
        let values: Vec<f64> = (0..48)
            .map(|i| 10.0 + 3.0 * (2.0 * PI * i as f64 / 12.0).sin())
            .collect();
        let trained = TrendSeasonalModel::default().train(&monthly(&values)).unwrap();
        let forecast = trained.forecast(12).unwrap();
        let peak = forecast.values().iter().cloned().fold(f64::MIN, f64::max);
        let trough = forecast.values().iter().cloned().fold(f64::MAX, f64::min);
        assert!(peak - trough > 3.0);
    }

    #[test]
    fn test_too_short_series_is_rejected() {
        let result = TrendSeasonalModel::default().train(&monthly(&[1.0, 2.0]));
        assert!(matches!(result, Err(AnalysisError::InsufficientData { .. })));
    }
}
