//! ARIMA models for time series forecasting
//!
//! Estimation uses conditional sum of squares (CSS) on the differenced,
//! demeaned series. Pure autoregressions are solved in closed form; models
//! with moving-average terms start from a Hannan–Rissanen regression and are
//! refined with a Nelder–Mead search.

use crate::data::TimeSeries;
use crate::error::{AnalysisError, Result};
use crate::models::{normal_quantile, ForecastModel, ForecastResult, TrainedForecastModel};
use econ_math::linalg::ridge_least_squares;
use econ_math::optimize::{nelder_mead, NelderMeadOptions};
use econ_math::polynomial::{difference_operator, is_invertible, is_stationary, multiply, psi_weights};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Orders of an ARIMA(p, d, q) model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Whether a constant is estimated (only for undifferenced models)
    pub fn has_constant(&self) -> bool {
        self.d == 0
    }

    /// Number of estimated parameters, innovation variance included
    pub fn parameter_count(&self) -> usize {
        self.p + self.q + usize::from(self.has_constant()) + 1
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    order: ArimaOrder,
    /// Confidence level of the prediction interval
    interval_level: f64,
    /// Optimiser iteration cap for models with MA terms
    max_iterations: usize,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    /// Name of the model
    name: String,
    order: ArimaOrder,
    interval_level: f64,
    /// Fitted AR coefficients
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients
    ma_coefficients: Vec<f64>,
    /// Mean of the differenced series (zero when d > 0)
    mean: f64,
    /// Innovation variance
    sigma2: f64,
    log_likelihood: f64,
    aic: f64,
    /// Whether the optimiser met its tolerances and the fit is admissible
    converged: bool,
    /// Historical data
    historical_data: Vec<f64>,
    /// Demeaned differenced series
    centered: Vec<f64>,
    /// Residuals from fitting, aligned with `centered`
    residuals: Vec<f64>,
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::with_order(ArimaOrder::new(p, d, q))
    }

    pub fn with_order(order: ArimaOrder) -> Self {
        Self {
            name: order.to_string(),
            order,
            interval_level: 0.95,
            max_iterations: NelderMeadOptions::default().max_iterations,
        }
    }

    pub fn with_interval_level(mut self, level: f64) -> Self {
        self.interval_level = level;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Fit the model and report whether it converged.
    ///
    /// Unlike [`ForecastModel::train`], a fit that ran but did not converge is
    /// returned rather than rejected, so callers can inspect it.
    pub fn estimate(&self, values: &[f64]) -> Result<TrainedArimaModel> {
        let ArimaOrder { p, d, q } = self.order;

        let differenced = difference(values, d);
        let n = differenced.len();
        let required = p + q + 3;
        if n < required {
            return Err(AnalysisError::ModelFitFailure(format!(
                "{} needs at least {} differenced observations, have {}",
                self.name, required, n
            )));
        }

        let mean = if self.order.has_constant() {
            differenced.iter().sum::<f64>() / n as f64
        } else {
            0.0
        };
        let centered: Vec<f64> = differenced.iter().map(|w| w - mean).collect();

        let (params, optimiser_converged) = if q == 0 {
            (fit_autoregression(&centered, p)?, true)
        } else {
            let start = hannan_rissanen(&centered, p, q)
                .filter(|s| is_stationary(&s[..p]) && is_invertible(&s[p..]))
                .unwrap_or_else(|| vec![0.0; p + q]);
            let options = NelderMeadOptions {
                max_iterations: self.max_iterations,
                ..NelderMeadOptions::default()
            };
            let objective = |x: &[f64]| {
                let (phi, theta) = x.split_at(p);
                if !is_stationary(phi) || !is_invertible(theta) {
                    return f64::INFINITY;
                }
                conditional_sum_of_squares(&centered, phi, theta).0
            };
            let minimum = nelder_mead(objective, &start, &options)?;
            (minimum.point, minimum.converged)
        };

        let (phi, theta) = params.split_at(p);
        let (css, residuals) = conditional_sum_of_squares(&centered, phi, theta);
        let effective = (n - p) as f64;
        let sigma2 = (css / effective).max(f64::EPSILON);
        let log_likelihood = -0.5 * effective * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        let aic = 2.0 * self.order.parameter_count() as f64 - 2.0 * log_likelihood;

        let converged = optimiser_converged
            && aic.is_finite()
            && params.iter().all(|v| v.is_finite())
            && is_stationary(phi)
            && is_invertible(theta);

        Ok(TrainedArimaModel {
            name: self.name.clone(),
            order: self.order,
            interval_level: self.interval_level,
            ar_coefficients: phi.to_vec(),
            ma_coefficients: theta.to_vec(),
            mean,
            sigma2,
            log_likelihood,
            aic,
            converged,
            historical_data: values.to_vec(),
            centered,
            residuals,
        })
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, series: &TimeSeries) -> Result<TrainedArimaModel> {
        let trained = self.estimate(&series.values())?;
        if !trained.converged {
            return Err(AnalysisError::ModelFitFailure(format!(
                "{} did not converge for {}",
                self.name,
                series.series_id()
            )));
        }
        Ok(trained)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Innovation variance
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Intercept `c` of `w_t = c + sum(phi_i * w_{t-i}) + ...`, zero when d > 0
    pub fn constant(&self) -> f64 {
        self.mean * (1.0 - self.ar_coefficients.iter().sum::<f64>())
    }

    /// Point forecasts on the differenced scale
    fn forecast_differenced(&self, horizon: usize) -> Vec<f64> {
        let p = self.ar_coefficients.len();
        let q = self.ma_coefficients.len();
        let mut history = self.centered.clone();
        let mut shocks = self.residuals.clone();

        for _ in 0..horizon {
            let t = history.len();
            let ar: f64 = (0..p)
                .filter(|i| t > *i)
                .map(|i| self.ar_coefficients[i] * history[t - 1 - i])
                .sum();
            let ma: f64 = (0..q)
                .filter(|j| t > *j)
                .map(|j| self.ma_coefficients[j] * shocks[t - 1 - j])
                .sum();
            history.push(ar + ma);
            shocks.push(0.0);
        }

        history[self.centered.len()..]
            .iter()
            .map(|z| z + self.mean)
            .collect()
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizons: usize) -> Result<ForecastResult> {
        let differenced = self.forecast_differenced(horizons);
        let values = undifference(&self.historical_data, &differenced, self.order.d);

        // psi weights of phi(B)(1 - B)^d against theta(B)
        let mut ar_polynomial = vec![1.0];
        ar_polynomial.extend(self.ar_coefficients.iter().map(|a| -a));
        let integrated = multiply(&ar_polynomial, &difference_operator(self.order.d));
        let recursion: Vec<f64> = integrated.iter().skip(1).map(|c| -c).collect();
        let psi = psi_weights(&recursion, &self.ma_coefficients, horizons);

        let z = normal_quantile(self.interval_level)?;
        let mut cumulative = 0.0;
        let intervals = values
            .iter()
            .zip(psi.iter())
            .map(|(&value, &weight)| {
                cumulative += weight * weight;
                let half_width = z * (self.sigma2 * cumulative).sqrt();
                (value - half_width, value + half_width)
            })
            .collect();

        ForecastResult::new_with_intervals(values, intervals)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Apply `d` first differences
pub fn difference(values: &[f64], d: usize) -> Vec<f64> {
    (0..d).fold(values.to_vec(), |acc, _| {
        acc.windows(2).map(|w| w[1] - w[0]).collect()
    })
}

/// Integrate forecasts made on the `d`-times differenced scale back onto the
/// original scale, anchoring each level on the last observed value.
pub fn undifference(history: &[f64], forecasts: &[f64], d: usize) -> Vec<f64> {
    let levels: Vec<Vec<f64>> = (0..d)
        .scan(history.to_vec(), |level, _| {
            let current = level.clone();
            *level = difference(level, 1);
            Some(current)
        })
        .collect();

    levels.iter().rev().fold(forecasts.to_vec(), |diffs, level| {
        let mut anchor = level.last().copied().unwrap_or(0.0);
        diffs
            .iter()
            .map(|delta| {
                anchor += delta;
                anchor
            })
            .collect()
    })
}

/// Residuals and their sum of squares, conditioning on the first `p` values
fn conditional_sum_of_squares(z: &[f64], phi: &[f64], theta: &[f64]) -> (f64, Vec<f64>) {
    let p = phi.len();
    let mut residuals = vec![0.0; z.len()];
    let mut sum = 0.0;
    for t in p..z.len() {
        let ar: f64 = phi.iter().enumerate().map(|(i, a)| a * z[t - 1 - i]).sum();
        let ma: f64 = theta
            .iter()
            .enumerate()
            .filter(|(j, _)| t > *j)
            .map(|(j, b)| b * residuals[t - 1 - j])
            .sum();
        residuals[t] = z[t] - ar - ma;
        sum += residuals[t] * residuals[t];
    }
    (sum, residuals)
}

/// Least-squares regression of `z_t` on its own `p` lags
fn fit_autoregression(z: &[f64], p: usize) -> Result<Vec<f64>> {
    if p == 0 {
        return Ok(Vec::new());
    }
    let design: Vec<Vec<f64>> = (p..z.len())
        .map(|t| (1..=p).map(|i| z[t - i]).collect())
        .collect();
    Ok(ridge_least_squares(&design, &z[p..], &vec![0.0; p])?)
}

/// Two-stage regression start for ARMA parameters: a long autoregression
/// supplies residual estimates, then `z_t` is regressed on `p` lags of itself
/// and `q` lags of those residuals.
fn hannan_rissanen(z: &[f64], p: usize, q: usize) -> Option<Vec<f64>> {
    let n = z.len();
    let long_order = (p + q + 2).max(4).min(n / 3);
    let start = long_order + q.max(p);
    if long_order == 0 || n <= start + p + q + 1 {
        return None;
    }

    let long_ar = fit_autoregression(z, long_order).ok()?;
    let mut shocks = vec![0.0; n];
    for t in long_order..n {
        let fitted: f64 = long_ar.iter().enumerate().map(|(i, a)| a * z[t - 1 - i]).sum();
        shocks[t] = z[t] - fitted;
    }

    let design: Vec<Vec<f64>> = (start..n)
        .map(|t| {
            (1..=p)
                .map(|i| z[t - i])
                .chain((1..=q).map(|j| shocks[t - j]))
                .collect()
        })
        .collect();
    ridge_least_squares(&design, &z[start..], &vec![0.0; p + q]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    /// AR(1) with phi = 0.6 driven by a fixed pseudo-random sequence
    fn ar1_series(n: usize) -> Vec<f64> {
        let mut state: u64 = 7;
        let mut values = Vec::with_capacity(n);
        let mut previous = 0.0;
        for _ in 0..n {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let noise = ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
            previous = 0.6 * previous + noise;
            values.push(10.0 + previous);
        }
        values
    }

    #[test]
    fn test_difference_and_undifference() {
        let values = vec![1.0, 3.0, 6.0, 10.0];
        assert_eq!(difference(&values, 1), vec![2.0, 3.0, 4.0]);
        assert_eq!(difference(&values, 2), vec![1.0, 1.0]);
        assert_eq!(undifference(&values, &[5.0, 6.0], 1), vec![15.0, 21.0]);
        // second differences continue at 1.0: next first differences 5, 6
        assert_eq!(undifference(&values, &[1.0, 1.0], 2), vec![15.0, 21.0]);
        assert_eq!(undifference(&values, &[7.0], 0), vec![7.0]);
    }

    #[test]
    fn test_ar1_coefficient_is_recovered() {
        let trained = ArimaModel::new(1, 0, 0).estimate(&ar1_series(400)).unwrap();
        assert!(trained.converged());
        assert_relative_eq!(trained.ar_coefficients()[0], 0.6, epsilon = 0.1);
        let implied_mean = trained.constant() / (1.0 - trained.ar_coefficients()[0]);
        assert_relative_eq!(implied_mean, 10.0, epsilon = 0.2);
    }

    #[test]
    fn test_arma_fit_is_admissible() {
        let trained = ArimaModel::new(1, 0, 1).estimate(&ar1_series(200)).unwrap();
        assert!(is_stationary(trained.ar_coefficients()));
        assert!(is_invertible(trained.ma_coefficients()));
        assert!(trained.aic().is_finite());
    }

    #[test]
    fn test_random_walk_forecast_is_flat_with_growing_interval() {
        let values: Vec<f64> = ar1_series(60)
            .iter()
            .scan(0.0, |acc, v| {
                *acc += v - 10.0;
                Some(*acc)
            })
            .collect();
        let last = *values.last().unwrap();
        let trained = ArimaModel::new(0, 1, 0).estimate(&values).unwrap();
        let forecast = trained.forecast(4).unwrap();

        for value in forecast.values() {
            assert_relative_eq!(*value, last, epsilon = 1e-12);
        }
        let widths: Vec<f64> = forecast.intervals().iter().map(|(l, u)| u - l).collect();
        assert_relative_eq!(widths[3] / widths[0], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_too_few_observations() {
        let result = ArimaModel::new(2, 1, 2).estimate(&[1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(result, Err(AnalysisError::ModelFitFailure(_))));
    }

    #[test]
    fn test_aic_penalises_parameters() {
        let values = ar1_series(120);
        let small = ArimaModel::new(1, 0, 0).estimate(&values).unwrap();
        assert_eq!(small.order().parameter_count(), 3);
        assert_relative_eq!(small.aic(), 6.0 - 2.0 * small.log_likelihood());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(ArimaOrder::new(2, 1, 0).to_string(), "ARIMA(2,1,0)");
    }
}
