//! Small dense least-squares helpers

use crate::{MathError, Result};

/// Solve `a * x = b` for a square system by Gaussian elimination with
/// partial pivoting.
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "Expected a {}x{} system",
            n, n
        )));
    }

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(MathError::SingularMatrix(format!(
                "Pivot {} is numerically zero",
                col
            )));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let pivot_row = a[col].clone();
        let pivot_rhs = b[col];
        for row in (col + 1)..n {
            let factor = a[row][col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * pivot_row[k];
            }
            b[row] -= factor * pivot_rhs;
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(MathError::CalculationError(
            "Solution contains non-finite values".to_string(),
        ));
    }

    Ok(x)
}

/// Penalised least squares: minimises `|y - X b|^2 + sum(penalty_j * b_j^2)`.
///
/// `design` is row-major with one row per observation. Pass zero penalties
/// for ordinary least squares.
pub fn ridge_least_squares(design: &[Vec<f64>], y: &[f64], penalties: &[f64]) -> Result<Vec<f64>> {
    let Some(width) = design.first().map(Vec::len) else {
        return Err(MathError::InsufficientData(
            "Design matrix has no rows".to_string(),
        ));
    };
    if design.len() != y.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but target has {} values",
            design.len(),
            y.len()
        )));
    }
    if penalties.len() != width || design.iter().any(|r| r.len() != width) {
        return Err(MathError::InvalidInput(
            "Penalties and design rows must match the column count".to_string(),
        ));
    }

    let mut gram = vec![vec![0.0; width]; width];
    let mut rhs = vec![0.0; width];
    for (row, &target) in design.iter().zip(y.iter()) {
        for i in 0..width {
            rhs[i] += row[i] * target;
            for j in i..width {
                gram[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..width {
        for j in 0..i {
            let mirrored = gram[j][i];
            gram[i][j] = mirrored;
        }
        gram[i][i] += penalties[i];
    }

    solve(gram, rhs)
}

/// Residual sum of squares of a fitted linear model
pub fn residual_sum_of_squares(design: &[Vec<f64>], y: &[f64], coefficients: &[f64]) -> f64 {
    design
        .iter()
        .zip(y.iter())
        .map(|(row, &target)| {
            let fitted: f64 = row.iter().zip(coefficients).map(|(x, b)| x * b).sum();
            (target - fitted).powi(2)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_small_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve(a, vec![3.0, 5.0]).unwrap();
        assert_relative_eq!(x[0], 0.8, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.4, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_system() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(matches!(
            solve(a, vec![1.0, 2.0]),
            Err(MathError::SingularMatrix(_))
        ));
    }

    #[test]
    fn test_ordinary_least_squares_recovers_line() {
        let design: Vec<Vec<f64>> = (0..10).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 3.0 + 2.0 * i as f64).collect();
        let beta = ridge_least_squares(&design, &y, &[0.0, 0.0]).unwrap();
        assert_relative_eq!(beta[0], 3.0, epsilon = 1e-9);
        assert_relative_eq!(beta[1], 2.0, epsilon = 1e-9);
        assert!(residual_sum_of_squares(&design, &y, &beta) < 1e-12);
    }

    #[test]
    fn test_ridge_shrinks_coefficients() {
        let design: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 2.0 * i as f64).collect();
        let ols = ridge_least_squares(&design, &y, &[0.0]).unwrap();
        let ridge = ridge_least_squares(&design, &y, &[100.0]).unwrap();
        assert!(ridge[0].abs() < ols[0].abs());
    }
}
