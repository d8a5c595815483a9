//! Multinomial naive Bayes with one-observation-at-a-time updates.

use serde::{Deserialize, Serialize};

use crate::error::{AugurError, AugurResult};
use crate::types::Category;

/// Laplace smoothing constant.
const ALPHA: f64 = 1.0;

/// Multinomial naive Bayes over the fixed category universe.
///
/// State is a per-class observation count and per-class feature
/// accumulators; `partial_fit` folds one example in without rescanning
/// history. Inputs must be non-negative (the engine scales and takes the
/// absolute value before calling in). Probabilities are computed in log
/// space and normalized with log-sum-exp; classes never seen keep
/// probability zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNb {
    /// Observations seen per class, indexed by `Category::index()`.
    class_counts: Vec<f64>,
    /// Per-class, per-dimension feature accumulators.
    feature_counts: Vec<Vec<f64>>,
    /// Feature dimension, fixed by the first update.
    n_features: usize,
}

impl MultinomialNb {
    pub fn new() -> Self {
        Self {
            class_counts: vec![0.0; Category::COUNT],
            feature_counts: vec![Vec::new(); Category::COUNT],
            n_features: 0,
        }
    }

    /// Whether any observation has been learned.
    pub fn is_trained(&self) -> bool {
        self.class_counts.iter().any(|&c| c > 0.0)
    }

    /// Incorporate one labeled example.
    ///
    /// The first call fixes the feature dimension; later calls with a
    /// different dimension are an internal error (the category set and
    /// feature layout must not change while a model instance is live).
    pub fn partial_fit(&mut self, features: &[f64], target: Category) -> AugurResult<()> {
        if self.n_features == 0 {
            self.n_features = features.len();
            for counts in &mut self.feature_counts {
                counts.resize(self.n_features, 0.0);
            }
        } else if features.len() != self.n_features {
            return Err(AugurError::Internal(format!(
                "feature dimension {} does not match model dimension {}",
                features.len(),
                self.n_features
            )));
        }

        let class = target.index();
        self.class_counts[class] += 1.0;
        for (accumulator, value) in self.feature_counts[class].iter_mut().zip(features) {
            *accumulator += value;
        }
        Ok(())
    }

    /// Probability distribution over all categories for one feature vector.
    pub fn predict_proba(&self, features: &[f64]) -> AugurResult<Vec<f64>> {
        if !self.is_trained() {
            return Err(AugurError::not_trained());
        }
        if features.len() != self.n_features {
            return Err(AugurError::Internal(format!(
                "feature dimension {} does not match model dimension {}",
                features.len(),
                self.n_features
            )));
        }

        let total: f64 = self.class_counts.iter().sum();
        let mut log_scores = vec![f64::NEG_INFINITY; Category::COUNT];
        for class in 0..Category::COUNT {
            if self.class_counts[class] <= 0.0 {
                continue;
            }
            let log_prior = (self.class_counts[class] / total).ln();
            let feature_total: f64 = self.feature_counts[class].iter().sum();
            let denominator = feature_total + ALPHA * self.n_features as f64;

            let mut log_likelihood = 0.0;
            for (value, count) in features.iter().zip(&self.feature_counts[class]) {
                let log_theta = ((count + ALPHA) / denominator).ln();
                log_likelihood += value * log_theta;
            }
            log_scores[class] = log_prior + log_likelihood;
        }

        Ok(normalize_log_scores(&log_scores))
    }
}

impl Default for MultinomialNb {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn log scores into a probability distribution via log-sum-exp.
/// `-inf` entries come out as exactly zero.
fn normalize_log_scores(log_scores: &[f64]) -> Vec<f64> {
    let max = log_scores
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let shifted: Vec<f64> = log_scores
        .iter()
        .map(|&s| if s.is_finite() { (s - max).exp() } else { 0.0 })
        .collect();
    let sum: f64 = shifted.iter().sum();
    shifted.iter().map(|&v| v / sum).collect()
}
