//! Descriptive statistics over plain slices
//!
//! Means are computed as a left-to-right sum divided by the count so that
//! callers comparing against hand-computed figures get identical bits.

use crate::{MathError, Result};

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by n)
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Sample standard deviation (divides by n - 1), `None` below two values
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Pearson correlation of two equally long samples.
///
/// Returns `None` when fewer than two pairs are given or when either side
/// has zero variance. The result is clamped into `[-1, 1]`.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let mx = mean(x)?;
    let my = mean(y)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mx;
        let dy = b - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if !denom.is_finite() || denom == 0.0 {
        return None;
    }

    let r = cov / denom;
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Percentile with linear interpolation between closest ranks.
///
/// `q` is expressed in percent (`0.0..=100.0`).
pub fn percentile_linear(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take a percentile of an empty sample".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Percentile must be within [0, 100], got {}",
            q
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Column-wise standardisation to zero mean and unit (population) variance.
///
/// Constant columns are centred and left at zero.
pub fn standardize_columns(rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let Some(width) = rows.first().map(Vec::len) else {
        return Ok(Vec::new());
    };
    if rows.iter().any(|r| r.len() != width) {
        return Err(MathError::InvalidInput(
            "All rows must have the same number of columns".to_string(),
        ));
    }

    let mut scaled = rows.to_vec();
    for col in 0..width {
        let column: Vec<f64> = rows.iter().map(|r| r[col]).collect();
        let m = mean(&column).unwrap_or(0.0);
        let sd = population_std_dev(&column).unwrap_or(0.0);
        for row in scaled.iter_mut() {
            row[col] = if sd > 0.0 { (row[col] - m) / sd } else { 0.0 };
        }
    }

    Ok(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        assert_relative_eq!(population_std_dev(&values).unwrap(), 2.0);
        assert_relative_eq!(
            sample_std_dev(&values).unwrap(),
            (32.0_f64 / 7.0).sqrt(),
            epsilon = 1e-12
        );
        assert_eq!(mean(&[]), None);
        assert_eq!(sample_std_dev(&[1.0]), None);
    }

    #[test]
    fn test_pearson() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        let z = [5.0, 4.0, 3.0, 2.0, 1.0];
        assert_relative_eq!(pearson(&x, &y).unwrap(), 1.0);
        assert_relative_eq!(pearson(&x, &z).unwrap(), -1.0);
        assert_eq!(pearson(&x, &[3.0; 5]), None);
        assert_eq!(pearson(&[1.0], &[2.0]), None);
    }

    #[test]
    fn test_percentile_linear() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile_linear(&values, 50.0).unwrap(), 3.0);
        assert_relative_eq!(percentile_linear(&values, 10.0).unwrap(), 1.4);
        assert_relative_eq!(percentile_linear(&values, 100.0).unwrap(), 5.0);
        assert!(percentile_linear(&[], 10.0).is_err());
        assert!(percentile_linear(&values, 101.0).is_err());
    }

    #[test]
    fn test_standardize_columns() {
        let rows = vec![vec![1.0, 7.0], vec![2.0, 7.0], vec![3.0, 7.0]];
        let scaled = standardize_columns(&rows).unwrap();
        let first: Vec<f64> = scaled.iter().map(|r| r[0]).collect();
        assert_relative_eq!(mean(&first).unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(population_std_dev(&first).unwrap(), 1.0, epsilon = 1e-12);
        assert!(scaled.iter().all(|r| r[1] == 0.0));
    }
}
