//! ARIMA order selection by Akaike Information Criterion

use crate::config::ArimaSearchConfig;
use crate::error::{AnalysisError, Result};
use crate::models::arima::{ArimaModel, ArimaOrder, TrainedArimaModel};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// What happened to one candidate order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CandidateOutcome {
    Converged { aic: f64 },
    Failed { reason: String },
    /// Not started before the search deadline
    TimedOut,
}

/// One row of the search trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub order: ArimaOrder,
    pub outcome: CandidateOutcome,
}

/// Winning model together with the outcome of every candidate
#[derive(Debug, Clone)]
pub struct OrderSearchResult {
    pub best: TrainedArimaModel,
    /// Candidates in search order
    pub trace: Vec<CandidateResult>,
}

/// Grid search over (p, d, q)
#[derive(Debug, Clone)]
pub struct OrderSearch {
    config: ArimaSearchConfig,
}

impl OrderSearch {
    pub fn new(config: ArimaSearchConfig) -> Self {
        Self { config }
    }

    /// Candidate orders, p outermost then d then q, all ascending
    pub fn candidates(&self) -> Vec<ArimaOrder> {
        let mut orders = Vec::new();
        for p in 0..=self.config.max_p {
            for d in 0..=self.config.max_d {
                for q in 0..=self.config.max_q {
                    orders.push(ArimaOrder::new(p, d, q));
                }
            }
        }
        orders
    }

    /// Fit every candidate in parallel and keep the converged one with the
    /// lowest AIC. Ties go to the earlier candidate, so the result does not
    /// depend on which worker finishes first.
    pub fn search(&self, series_id: &str, values: &[f64]) -> Result<OrderSearchResult> {
        let deadline = Instant::now()
            .checked_add(self.config.search_timeout()?)
            .ok_or_else(|| {
                AnalysisError::InvalidParameter(format!(
                    "search_timeout_secs {} overflows the search deadline",
                    self.config.search_timeout_secs
                ))
            })?;

        let fits: Vec<(ArimaOrder, std::result::Result<TrainedArimaModel, CandidateOutcome>)> = self
            .candidates()
            .into_par_iter()
            .map(|order| {
                if Instant::now() >= deadline {
                    return (order, Err(CandidateOutcome::TimedOut));
                }
                let model = ArimaModel::with_order(order)
                    .with_interval_level(self.config.interval_level)
                    .with_max_iterations(self.config.max_iterations);
                let fit = match model.estimate(values) {
                    Ok(trained) if trained.converged() => Ok(trained),
                    Ok(_) => Err(CandidateOutcome::Failed {
                        reason: "did not converge".to_string(),
                    }),
                    Err(e) => Err(CandidateOutcome::Failed {
                        reason: e.to_string(),
                    }),
                };
                (order, fit)
            })
            .collect();

        let mut trace = Vec::with_capacity(fits.len());
        let mut best: Option<TrainedArimaModel> = None;
        for (order, fit) in fits {
            let outcome = match fit {
                Ok(trained) => {
                    let aic = trained.aic();
                    if best.as_ref().map_or(true, |b| aic < b.aic()) {
                        best = Some(trained);
                    }
                    CandidateOutcome::Converged { aic }
                }
                Err(outcome) => outcome,
            };
            debug!("{} {}: {:?}", series_id, order, outcome);
            trace.push(CandidateResult { order, outcome });
        }

        match best {
            Some(best) => {
                info!("{}: selected {} (AIC {:.3})", series_id, best.order(), best.aic());
                Ok(OrderSearchResult { best, trace })
            }
            None => Err(AnalysisError::ModelFitFailure(format!(
                "No ARIMA order converged for {} ({} candidates tried)",
                series_id,
                trace.len()
            ))),
        }
    }
}

impl Default for OrderSearch {
    fn default() -> Self {
        Self::new(ArimaSearchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wavy(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 0.5 * i as f64 + ((i * 37) % 11) as f64 * 0.3)
            .collect()
    }

    #[test]
    fn test_eighteen_candidates_in_order() {
        let candidates = OrderSearch::default().candidates();
        assert_eq!(candidates.len(), 18);
        assert_eq!(candidates[0], ArimaOrder::new(0, 0, 0));
        assert_eq!(candidates[1], ArimaOrder::new(0, 0, 1));
        assert_eq!(candidates[3], ArimaOrder::new(0, 1, 0));
        assert_eq!(candidates[17], ArimaOrder::new(2, 1, 2));
    }

    #[test]
    fn test_selects_minimum_aic_among_converged() {
        let result = OrderSearch::default().search("TEST", &wavy(48)).unwrap();
        assert_eq!(result.trace.len(), 18);

        let min_aic = result
            .trace
            .iter()
            .filter_map(|c| match c.outcome {
                CandidateOutcome::Converged { aic } => Some(aic),
                _ => None,
            })
            .fold(f64::INFINITY, f64::min);
        assert_eq!(result.best.aic(), min_aic);

        let first_minimum = result
            .trace
            .iter()
            .find(|c| c.outcome == CandidateOutcome::Converged { aic: min_aic })
            .map(|c| c.order);
        assert_eq!(Some(result.best.order()), first_minimum);
    }

    #[test]
    fn test_zero_timeout_is_model_fit_failure() {
        let search = OrderSearch::new(ArimaSearchConfig {
            search_timeout_secs: 0.0,
            ..ArimaSearchConfig::default()
        });
        assert!(matches!(
            search.search("TEST", &wavy(48)),
            Err(AnalysisError::ModelFitFailure(_))
        ));
    }

    #[test]
    fn test_unbounded_timeout_is_invalid_parameter() {
        for timeout in [f64::INFINITY, f64::NAN, 1e300] {
            let search = OrderSearch::new(ArimaSearchConfig {
                search_timeout_secs: timeout,
                ..ArimaSearchConfig::default()
            });
            assert!(matches!(
                search.search("TEST", &wavy(48)),
                Err(AnalysisError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_too_short_series_fails_every_candidate() {
        let result = OrderSearch::default().search("TEST", &[1.0, 2.0]);
        assert!(matches!(result, Err(AnalysisError::ModelFitFailure(_))));
    }
}
