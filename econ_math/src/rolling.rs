//! Rolling-window and lagged feature helpers
//!
//! Every helper returns one entry per input value; positions without enough
//! history are `None` rather than being filled in.

use crate::stats::{mean, sample_std_dev};
use crate::{MathError, Result};
use std::collections::VecDeque;

/// Trailing window over a stream of values with a minimum-period rule
#[derive(Debug, Clone)]
pub struct RollingWindow {
    window: usize,
    min_periods: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    /// Create a new rolling window
    pub fn new(window: usize, min_periods: usize) -> Result<Self> {
        if window == 0 {
            return Err(MathError::InvalidInput(
                "Window must be greater than zero".to_string(),
            ));
        }
        if min_periods == 0 || min_periods > window {
            return Err(MathError::InvalidInput(format!(
                "Minimum periods must be within 1..={}, got {}",
                window, min_periods
            )));
        }

        Ok(Self {
            window,
            min_periods,
            values: VecDeque::with_capacity(window),
        })
    }

    /// Push a new value, evicting the oldest once the window is full
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        if self.values.len() > self.window {
            self.values.pop_front();
        }
    }

    /// Whether enough values have been seen to produce a statistic
    pub fn is_ready(&self) -> bool {
        self.values.len() >= self.min_periods
    }

    /// Mean of the current window
    pub fn mean(&self) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        let (a, b) = self.values.as_slices();
        let joined: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
        mean(&joined)
    }

    /// Sample standard deviation of the current window
    pub fn std_dev(&self) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        let (a, b) = self.values.as_slices();
        let joined: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
        sample_std_dev(&joined)
    }

    /// Get the window length
    pub fn window(&self) -> usize {
        self.window
    }

    /// Reset the window, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

/// Value `periods` steps back, aligned to each position
pub fn lag(values: &[f64], periods: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| i.checked_sub(periods).map(|j| values[j]))
        .collect()
}

/// Rolling mean with a minimum-period rule
pub fn rolling_mean(values: &[f64], window: usize, min_periods: usize) -> Result<Vec<Option<f64>>> {
    let mut rolling = RollingWindow::new(window, min_periods)?;
    Ok(values
        .iter()
        .map(|&v| {
            rolling.update(v);
            rolling.mean()
        })
        .collect())
}

/// Rolling sample standard deviation with a minimum-period rule
pub fn rolling_std(values: &[f64], window: usize, min_periods: usize) -> Result<Vec<Option<f64>>> {
    let mut rolling = RollingWindow::new(window, min_periods)?;
    Ok(values
        .iter()
        .map(|&v| {
            rolling.update(v);
            rolling.std_dev()
        })
        .collect())
}

/// Fractional change against the value `periods` steps back.
///
/// A zero or non-finite base yields `None`.
pub fn pct_change(values: &[f64], periods: usize) -> Vec<Option<f64>> {
    lag(values, periods)
        .into_iter()
        .zip(values.iter())
        .map(|(base, &current)| {
            base.filter(|b| *b != 0.0)
                .map(|b| current / b - 1.0)
                .filter(|c| c.is_finite())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lag() {
        let lagged = lag(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(lagged, vec![None, None, None, Some(1.0)]);
    }

    #[test]
    fn test_rolling_mean_min_periods() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let means = rolling_mean(&values, 6, 3).unwrap();
        assert_eq!(means[0], None);
        assert_eq!(means[1], None);
        assert_eq!(means[2], Some(2.0));
        assert_eq!(means[5], Some(3.5));
        assert_eq!(means[7], Some(5.5));
    }

    #[test]
    fn test_rolling_std_is_sample() {
        let values = [2.0, 4.0, 6.0];
        let stds = rolling_std(&values, 6, 3).unwrap();
        assert_relative_eq!(stds[2].unwrap(), 2.0);
    }

    #[test]
    fn test_pct_change() {
        let changes = pct_change(&[100.0, 0.0, 110.0, 5.0], 2);
        assert_eq!(changes[0], None);
        assert_relative_eq!(changes[2].unwrap(), 0.1, epsilon = 1e-12);
        assert_eq!(changes[3], None);
    }

    #[test]
    fn test_window_validation() {
        assert!(RollingWindow::new(0, 1).is_err());
        assert!(RollingWindow::new(6, 7).is_err());
    }
}
