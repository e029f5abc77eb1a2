//! Derivative-free minimisation
//!
//! A deterministic Nelder–Mead simplex search, used where a closed-form fit
//! is not available (moving-average terms of ARIMA models).

use crate::{MathError, Result};

/// Settings for a Nelder–Mead run
#[derive(Debug, Clone)]
pub struct NelderMeadOptions {
    /// Maximum number of simplex iterations
    pub max_iterations: usize,
    /// Convergence tolerance on the spread of objective values
    pub f_tolerance: f64,
    /// Convergence tolerance on the simplex diameter
    pub x_tolerance: f64,
    /// Initial step along each coordinate
    pub initial_step: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            f_tolerance: 1e-10,
            x_tolerance: 1e-6,
            initial_step: 0.1,
        }
    }
}

/// Outcome of a minimisation
#[derive(Debug, Clone)]
pub struct Minimum {
    /// Best point found
    pub point: Vec<f64>,
    /// Objective value at `point`
    pub value: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Whether the tolerances were met before the iteration cap
    pub converged: bool,
}

/// Minimise `objective` starting from `start`.
///
/// The objective may return `f64::INFINITY` to reject infeasible points.
pub fn nelder_mead<F>(objective: F, start: &[f64], options: &NelderMeadOptions) -> Result<Minimum>
where
    F: Fn(&[f64]) -> f64,
{
    let dim = start.len();
    if dim == 0 {
        return Err(MathError::InvalidInput(
            "Cannot optimise over zero parameters".to_string(),
        ));
    }

    let start_value = objective(start);
    if !start_value.is_finite() {
        return Err(MathError::CalculationError(
            "Objective is not finite at the starting point".to_string(),
        ));
    }

    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(dim + 1);
    simplex.push((start.to_vec(), start_value));
    for i in 0..dim {
        let mut vertex = start.to_vec();
        let step = if vertex[i].abs() > 1e-8 {
            options.initial_step * vertex[i].abs().max(1.0)
        } else {
            options.initial_step
        };
        vertex[i] += step;
        let value = objective(&vertex);
        simplex.push((vertex, value));
    }

    let (alpha, gamma, rho, sigma) = (1.0, 2.0, 0.5, 0.5);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

        let best = simplex[0].1;
        let worst = simplex[dim].1;
        let f_spread = (worst - best).abs();
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|(v, _)| v.iter().zip(simplex[0].0.iter()).map(|(a, b)| (a - b).abs()))
            .fold(0.0_f64, f64::max);
        if worst.is_finite()
            && x_spread <= options.x_tolerance
            && f_spread <= options.f_tolerance * (1.0 + best.abs())
        {
            converged = true;
            break;
        }

        iterations += 1;

        let centroid: Vec<f64> = (0..dim)
            .map(|j| simplex[..dim].iter().map(|(v, _)| v[j]).sum::<f64>() / dim as f64)
            .collect();
        let along = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(simplex[dim].0.iter())
                .map(|(c, w)| c + coef * (c - w))
                .collect()
        };

        let reflected = along(alpha);
        let reflected_value = objective(&reflected);

        if reflected_value < simplex[0].1 {
            let expanded = along(gamma);
            let expanded_value = objective(&expanded);
            simplex[dim] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
            continue;
        }

        if reflected_value < simplex[dim - 1].1 {
            simplex[dim] = (reflected, reflected_value);
            continue;
        }

        let contracted = if reflected_value < simplex[dim].1 {
            along(rho)
        } else {
            along(-rho)
        };
        let contracted_value = objective(&contracted);
        if contracted_value < simplex[dim].1.min(reflected_value) {
            simplex[dim] = (contracted, contracted_value);
            continue;
        }

        let anchor = simplex[0].0.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let shrunk: Vec<f64> = anchor
                .iter()
                .zip(vertex.0.iter())
                .map(|(a, v)| a + sigma * (v - a))
                .collect();
            let value = objective(&shrunk);
            *vertex = (shrunk, value);
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (point, value) = simplex.swap_remove(0);

    Ok(Minimum {
        point,
        value,
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadratic_bowl() {
        let objective = |x: &[f64]| (x[0] - 1.5).powi(2) + 2.0 * (x[1] + 0.5).powi(2);
        let minimum = nelder_mead(objective, &[0.0, 0.0], &NelderMeadOptions::default()).unwrap();
        assert!(minimum.converged);
        assert_relative_eq!(minimum.point[0], 1.5, epsilon = 1e-3);
        assert_relative_eq!(minimum.point[1], -0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_iteration_cap_reports_not_converged() {
        let objective = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2);
        let options = NelderMeadOptions {
            max_iterations: 3,
            ..NelderMeadOptions::default()
        };
        let minimum = nelder_mead(objective, &[-1.2, 1.0], &options).unwrap();
        assert!(!minimum.converged);
        assert_eq!(minimum.iterations, 3);
    }

    #[test]
    fn test_infeasible_start_is_rejected() {
        let objective = |_: &[f64]| f64::INFINITY;
        assert!(nelder_mead(objective, &[0.0], &NelderMeadOptions::default()).is_err());
    }
}
