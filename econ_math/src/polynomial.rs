//! Lag-polynomial helpers for autoregressive models

/// Whether the autoregressive recursion `x_t = sum(phi_i * x_{t-i})` is
/// stationary, i.e. every root of `1 - phi_1 z - ... - phi_p z^p` lies
/// outside the unit circle.
///
/// Uses the step-down (reverse Levinson) recursion: the polynomial is stable
/// iff every reflection coefficient is strictly inside `(-1, 1)`.
pub fn is_stationary(phi: &[f64]) -> bool {
    if phi.iter().any(|c| !c.is_finite()) {
        return false;
    }

    let mut coefficients = phi.to_vec();
    while let Some(&reflection) = coefficients.last() {
        if reflection.abs() >= 1.0 {
            return false;
        }
        let k = coefficients.len();
        let denom = 1.0 - reflection * reflection;
        let reduced: Vec<f64> = (0..k - 1)
            .map(|j| (coefficients[j] + reflection * coefficients[k - 2 - j]) / denom)
            .collect();
        coefficients = reduced;
    }

    true
}

/// Whether the moving-average polynomial `1 + theta_1 z + ... + theta_q z^q`
/// is invertible.
pub fn is_invertible(theta: &[f64]) -> bool {
    let negated: Vec<f64> = theta.iter().map(|t| -t).collect();
    is_stationary(&negated)
}

/// Multiply two polynomials given by ascending coefficients
pub fn multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut product = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            product[i + j] += x * y;
        }
    }
    product
}

/// Coefficients of `(1 - z)^d` in ascending order
pub fn difference_operator(d: usize) -> Vec<f64> {
    (0..d).fold(vec![1.0], |acc, _| multiply(&acc, &[1.0, -1.0]))
}

/// Psi (impulse-response) weights of `theta(z) / phi(z)`.
///
/// `ar` holds the recursion coefficients of the full (integrated)
/// autoregressive side and `ma` the moving-average coefficients; the first
/// `count` weights are returned, starting with `psi_0 = 1`.
pub fn psi_weights(ar: &[f64], ma: &[f64], count: usize) -> Vec<f64> {
    let mut psi = Vec::with_capacity(count);
    for j in 0..count {
        if j == 0 {
            psi.push(1.0);
            continue;
        }
        let ma_term = ma.get(j - 1).copied().unwrap_or(0.0);
        let ar_term: f64 = ar
            .iter()
            .enumerate()
            .take(j)
            .map(|(i, a)| a * psi[j - 1 - i])
            .sum();
        psi.push(ma_term + ar_term);
    }
    psi
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ar1_stationarity() {
        assert!(is_stationary(&[0.5]));
        assert!(is_stationary(&[-0.99]));
        assert!(!is_stationary(&[1.0]));
        assert!(is_stationary(&[]));
    }

    #[test]
    fn test_ar2_triangle() {
        // phi1 + phi2 < 1, phi2 - phi1 < 1, |phi2| < 1
        assert!(is_stationary(&[0.5, 0.3]));
        assert!(!is_stationary(&[0.7, 0.4]));
        assert!(!is_stationary(&[-0.7, 0.4]));
        assert!(!is_stationary(&[0.1, -1.0]));
    }

    #[test]
    fn test_ma_invertibility() {
        assert!(is_invertible(&[0.4]));
        assert!(!is_invertible(&[1.2]));
        assert!(is_invertible(&[0.3, 0.2]));
    }

    #[test]
    fn test_difference_operator() {
        assert_eq!(difference_operator(0), vec![1.0]);
        assert_eq!(difference_operator(1), vec![1.0, -1.0]);
        assert_eq!(difference_operator(2), vec![1.0, -2.0, 1.0]);
    }

    #[test]
    fn test_psi_weights_random_walk() {
        // (1 - B) y_t = e_t  =>  y_t = y_{t-1} + e_t, psi_j = 1
        let psi = psi_weights(&[1.0], &[], 4);
        assert_eq!(psi, vec![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_psi_weights_arma11() {
        let psi = psi_weights(&[0.5], &[0.3], 3);
        assert_relative_eq!(psi[1], 0.8);
        assert_relative_eq!(psi[2], 0.4);
    }
}
