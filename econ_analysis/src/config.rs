//! Analysis configuration
//!
//! Every field has a default so a TOML file only needs to name what it
//! changes:
//!
//! ```toml
//! [forecast]
//! horizon = 12
//!
//! [anomaly]
//! contamination = 0.05
//! ```

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Root configuration for an analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub forecast: ForecastConfig,
    pub anomaly: AnomalyConfig,
    pub correlation: CorrelationConfig,
    pub retry: RetryConfig,
}

/// Ensemble forecasting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of future monthly periods
    pub horizon: usize,
    /// Minimum observations before a series is forecast
    pub min_observations: usize,
    pub weights: EnsembleWeights,
    pub trend: TrendSeasonalConfig,
    pub arima: ArimaSearchConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 6,
            min_observations: 24,
            weights: EnsembleWeights::default(),
            trend: TrendSeasonalConfig::default(),
            arima: ArimaSearchConfig::default(),
        }
    }
}

/// Fixed linear combination of the two model outputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    /// Weight of the trend-plus-seasonality model
    pub trend: f64,
    /// Weight of the autoregressive model
    pub autoregressive: f64,
}

impl EnsembleWeights {
    /// Create weights, rejecting negative values or a sum other than one
    pub fn new(trend: f64, autoregressive: f64) -> Result<Self> {
        let weights = Self {
            trend,
            autoregressive,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// Check the sum-to-one invariant
    pub fn validate(&self) -> Result<()> {
        if self.trend < 0.0 || self.autoregressive < 0.0 {
            return Err(AnalysisError::InvalidParameter(
                "Ensemble weights must be non-negative".to_string(),
            ));
        }
        if ((self.trend + self.autoregressive) - 1.0).abs() > 1e-9 {
            return Err(AnalysisError::InvalidParameter(format!(
                "Ensemble weights must sum to 1.0, got {}",
                self.trend + self.autoregressive
            )));
        }
        Ok(())
    }

    /// Weighted combination of one value from each model
    pub fn combine(&self, trend_value: f64, autoregressive_value: f64) -> f64 {
        self.trend * trend_value + self.autoregressive * autoregressive_value
    }
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            trend: 0.6,
            autoregressive: 0.4,
        }
    }
}

/// Trend-plus-seasonality model hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendSeasonalConfig {
    /// Number of Fourier pairs for the yearly component
    pub yearly_fourier_order: usize,
    /// Maximum number of potential trend changepoints
    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints may be placed
    pub changepoint_range: f64,
    /// Prior scale of changepoint rate adjustments (trend flexibility)
    pub changepoint_prior_scale: f64,
    /// Prior scale of the seasonal coefficients
    pub seasonality_prior_scale: f64,
    /// Width of the prediction interval
    pub interval_width: f64,
}

impl Default for TrendSeasonalConfig {
    fn default() -> Self {
        Self {
            yearly_fourier_order: 3,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            interval_width: 0.80,
        }
    }
}

/// Autoregressive order search bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaSearchConfig {
    pub max_p: usize,
    pub max_d: usize,
    pub max_q: usize,
    /// Confidence level of the prediction interval
    pub interval_level: f64,
    /// Wall-clock ceiling for the whole order search
    pub search_timeout_secs: f64,
    /// Iteration cap of the optimiser for models with moving-average terms
    pub max_iterations: usize,
}

/// Longest accepted order-search deadline, one day
pub const MAX_SEARCH_TIMEOUT_SECS: f64 = 86_400.0;

impl ArimaSearchConfig {
    /// Search deadline as a duration. Negative values clamp to zero; NaN,
    /// infinite and overflowing values are an error.
    pub fn search_timeout(&self) -> Result<Duration> {
        let secs = if self.search_timeout_secs < 0.0 {
            0.0
        } else {
            self.search_timeout_secs
        };
        Duration::try_from_secs_f64(secs).map_err(|e| {
            AnalysisError::InvalidParameter(format!(
                "search_timeout_secs {} is not a valid duration: {}",
                self.search_timeout_secs, e
            ))
        })
    }
}

impl Default for ArimaSearchConfig {
    fn default() -> Self {
        Self {
            max_p: 2,
            max_d: 1,
            max_q: 2,
            interval_level: 0.95,
            search_timeout_secs: 30.0,
            max_iterations: 2000,
        }
    }
}

/// Isolation-forest anomaly detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Expected fraction of outliers
    pub contamination: f64,
    pub n_trees: usize,
    /// Rows drawn per tree (capped at the row count)
    pub max_samples: usize,
    pub seed: u64,
    /// Minimum raw observations
    pub min_observations: usize,
    /// Minimum rows left after feature engineering
    pub min_clean_rows: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            contamination: 0.1,
            n_trees: 100,
            max_samples: 256,
            seed: 42,
            min_observations: 24,
            min_clean_rows: 12,
        }
    }
}

/// Cross-series correlation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Number of ranked pairs retained
    pub top_k: usize,
    /// Minimum overlapping observations for a defined correlation
    pub min_overlap: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            min_overlap: 3,
        }
    }
}

/// Backoff policy for repository reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            AnalysisError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent settings
    pub fn validate(&self) -> Result<()> {
        self.forecast.weights.validate()?;

        if self.forecast.horizon == 0 {
            return Err(AnalysisError::Config(
                "forecast.horizon must be at least 1".to_string(),
            ));
        }
        let width = self.forecast.trend.interval_width;
        let level = self.forecast.arima.interval_level;
        if !(width > 0.0 && width < 1.0) || !(level > 0.0 && level < 1.0) {
            return Err(AnalysisError::Config(
                "Interval widths must lie strictly between 0 and 1".to_string(),
            ));
        }
        let range = self.forecast.trend.changepoint_range;
        if !(range > 0.0 && range <= 1.0) {
            return Err(AnalysisError::Config(
                "forecast.trend.changepoint_range must lie in (0, 1]".to_string(),
            ));
        }
        if self.forecast.trend.changepoint_prior_scale <= 0.0
            || self.forecast.trend.seasonality_prior_scale <= 0.0
        {
            return Err(AnalysisError::Config(
                "Prior scales must be positive".to_string(),
            ));
        }
        let arima = &self.forecast.arima;
        if arima.max_p > 2 || arima.max_d > 2 || arima.max_q > 2 {
            return Err(AnalysisError::Config(
                "ARIMA search orders are limited to 2".to_string(),
            ));
        }
        if !(arima.search_timeout_secs >= 0.0
            && arima.search_timeout_secs <= MAX_SEARCH_TIMEOUT_SECS)
        {
            return Err(AnalysisError::Config(format!(
                "forecast.arima.search_timeout_secs must lie in [0, {}], got {}",
                MAX_SEARCH_TIMEOUT_SECS, arima.search_timeout_secs
            )));
        }
        if !(self.anomaly.contamination > 0.0 && self.anomaly.contamination <= 0.5) {
            return Err(AnalysisError::Config(format!(
                "anomaly.contamination must lie in (0, 0.5], got {}",
                self.anomaly.contamination
            )));
        }
        if self.anomaly.n_trees == 0 || self.anomaly.max_samples < 2 {
            return Err(AnalysisError::Config(
                "anomaly.n_trees must be positive and anomaly.max_samples at least 2".to_string(),
            ));
        }
        if self.correlation.min_overlap < 2 {
            return Err(AnalysisError::Config(
                "correlation.min_overlap must be at least 2".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 || self.retry.backoff_multiplier < 1.0 {
            return Err(AnalysisError::Config(
                "retry.max_attempts must be positive and retry.backoff_multiplier >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
