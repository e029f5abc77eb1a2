//! Isolation forest
//!
//! Each tree recursively splits a random subsample on a random feature at a
//! uniform threshold. Outliers are isolated in fewer splits, so a short
//! average path length means an anomalous row.

use crate::error::{AnalysisError, Result};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

const EULER_GAMMA: f64 = 0.577_215_664_9;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Forest settings
#[derive(Debug, Clone)]
pub struct IsolationForest {
    n_trees: usize,
    max_samples: usize,
    seed: u64,
}

/// Trained forest
#[derive(Debug, Clone)]
pub struct FittedForest {
    trees: Vec<Node>,
    sample_size: usize,
}

/// Average path length of an unsuccessful search in a binary search tree
/// of `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let m = (n - 1) as f64;
            2.0 * (m.ln() + EULER_GAMMA) - 2.0 * m / n as f64
        }
    }
}

impl IsolationForest {
    pub fn new(n_trees: usize, max_samples: usize, seed: u64) -> Result<Self> {
        if n_trees == 0 || max_samples < 2 {
            return Err(AnalysisError::InvalidParameter(
                "Isolation forest needs at least one tree and two samples per tree".to_string(),
            ));
        }
        Ok(Self {
            n_trees,
            max_samples,
            seed,
        })
    }

    /// Grow the forest. Tree `k` uses its own generator seeded with
    /// `seed + k`, so the result does not depend on thread scheduling.
    pub fn fit(&self, rows: &[Vec<f64>]) -> Result<FittedForest> {
        if rows.len() < 2 {
            return Err(AnalysisError::InvalidParameter(format!(
                "Isolation forest needs at least 2 rows, got {}",
                rows.len()
            )));
        }
        let sample_size = self.max_samples.min(rows.len());
        let height_limit = (sample_size as f64).log2().ceil() as usize;

        let trees = (0..self.n_trees)
            .into_par_iter()
            .map(|k| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(k as u64));
                let indices = sample(&mut rng, rows.len(), sample_size).into_vec();
                grow(rows, indices, 0, height_limit, &mut rng)
            })
            .collect();

        Ok(FittedForest { trees, sample_size })
    }
}

fn grow(rows: &[Vec<f64>], indices: Vec<usize>, depth: usize, limit: usize, rng: &mut StdRng) -> Node {
    if depth >= limit || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let width = rows[indices[0]].len();
    let splittable: Vec<(usize, f64, f64)> = (0..width)
        .filter_map(|feature| {
            let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(rows[i][feature]), hi.max(rows[i][feature]))
            });
            (max > min).then_some((feature, min, max))
        })
        .collect();
    if splittable.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];
    let threshold = rng.gen_range(min..max);
    let (left, right): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| rows[i][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(rows, left, depth + 1, limit, rng)),
        right: Box::new(grow(rows, right, depth + 1, limit, rng)),
    }
}

fn path_length(node: &Node, row: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] <= *threshold {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

impl FittedForest {
    /// Scores in `[-1, 0)`; lower is more anomalous
    pub fn score_samples(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        let normaliser = average_path_length(self.sample_size);
        rows.iter()
            .map(|row| {
                let mean_depth = self
                    .trees
                    .iter()
                    .map(|tree| path_length(tree, row, 0))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                -(2.0_f64).powf(-mean_depth / normaliser)
            })
            .collect()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
