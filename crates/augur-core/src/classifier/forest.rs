//! Random forest classifier for whole-history batch training.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{AugurError, AugurResult};
use crate::types::Category;

/// Forest hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum samples required to attempt a split.
    pub min_samples_split: usize,
    /// Minimum samples required on each side of a split.
    pub min_samples_leaf: usize,
    /// RNG seed for bootstrap and feature subsampling; training with the
    /// same data and seed reproduces the same forest.
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        /// Class probabilities at this leaf, indexed by `Category::index()`.
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<TreeNode>,
    root: usize,
}

impl Tree {
    fn predict_proba<'a>(&'a self, features: &[f64]) -> &'a [f64] {
        let mut node = self.root;
        loop {
            match &self.nodes[node] {
                TreeNode::Leaf { distribution } => return distribution,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Ensemble of CART trees over gini impurity, trained in one pass with
/// per-sample weights.
///
/// Each tree is grown on a weighted bootstrap sample with sqrt-feature
/// subsampling at every split. Feature importances are the accumulated,
/// normalized impurity decreases. Incorporating new data means fitting a
/// whole new forest; there is no incremental update in this classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<Tree>,
    feature_importances: Vec<f64>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            feature_importances: Vec::new(),
            n_features: 0,
        }
    }

    /// Whether a forest has been fitted.
    pub fn is_trained(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Normalized per-dimension importance scores; empty before training.
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Fit the forest and return training-set accuracy.
    pub fn fit(
        &mut self,
        rows: &[Vec<f64>],
        targets: &[Category],
        weights: &[f64],
    ) -> AugurResult<f64> {
        if rows.is_empty() {
            return Err(AugurError::Configuration(
                "cannot train a forest on zero samples".to_string(),
            ));
        }
        if rows.len() != targets.len() || rows.len() != weights.len() {
            return Err(AugurError::Internal(format!(
                "training arrays disagree: {} rows, {} targets, {} weights",
                rows.len(),
                targets.len(),
                weights.len()
            )));
        }
        let n_features = rows[0].len();
        if rows.iter().any(|r| r.len() != n_features) {
            return Err(AugurError::Internal(
                "inconsistent feature dimensions in training matrix".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let sampler = WeightedIndex::new(weights)
            .map_err(|e| AugurError::Internal(format!("invalid sample weights: {}", e)))?;

        let mut importances = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(self.params.n_trees);
        for _ in 0..self.params.n_trees {
            let indices: Vec<usize> = (0..rows.len())
                .map(|_| sampler.sample(&mut rng))
                .collect();
            let mut builder = TreeBuilder {
                rows,
                targets,
                weights,
                params: &self.params,
                n_features,
                nodes: Vec::new(),
                importances: &mut importances,
            };
            let root = builder.build(indices, 0, &mut rng);
            trees.push(Tree {
                nodes: builder.nodes,
                root,
            });
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for importance in &mut importances {
                *importance /= total;
            }
        }

        self.trees = trees;
        self.feature_importances = importances;
        self.n_features = n_features;

        let correct = rows
            .iter()
            .zip(targets)
            .filter(|(row, target)| {
                self.predict_proba(row)
                    .ok()
                    .map(|p| argmax(&p) == target.index())
                    .unwrap_or(false)
            })
            .count();
        Ok(correct as f64 / rows.len() as f64)
    }

    /// Probability distribution over all categories, averaged across trees.
    pub fn predict_proba(&self, features: &[f64]) -> AugurResult<Vec<f64>> {
        if !self.is_trained() {
            return Err(AugurError::not_trained());
        }
        if features.len() != self.n_features {
            return Err(AugurError::Internal(format!(
                "feature dimension {} does not match fitted dimension {}",
                features.len(),
                self.n_features
            )));
        }

        let mut probabilities = vec![0.0; Category::COUNT];
        for tree in &self.trees {
            for (total, p) in probabilities.iter_mut().zip(tree.predict_proba(features)) {
                *total += p;
            }
        }
        let n = self.trees.len() as f64;
        for p in &mut probabilities {
            *p /= n;
        }
        Ok(probabilities)
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    targets: &'a [Category],
    weights: &'a [f64],
    params: &'a ForestParams,
    n_features: usize,
    nodes: Vec<TreeNode>,
    importances: &'a mut Vec<f64>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

impl<'a> TreeBuilder<'a> {
    /// Grow a subtree over the given bootstrap indices; returns the node id.
    fn build(&mut self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let (class_weights, total_weight) = self.class_weights(&indices);
        let impurity = gini(&class_weights, total_weight);

        let must_stop = depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split
            || impurity <= 0.0;
        if !must_stop {
            if let Some(split) = self.best_split(&indices, &class_weights, total_weight, rng) {
                self.importances[split.feature] += total_weight * split.decrease;

                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .into_iter()
                    .partition(|&i| self.rows[i][split.feature] <= split.threshold);
                let left = self.build(left_indices, depth + 1, rng);
                let right = self.build(right_indices, depth + 1, rng);
                self.nodes.push(TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                });
                return self.nodes.len() - 1;
            }
        }

        self.nodes.push(TreeNode::Leaf {
            distribution: leaf_distribution(&class_weights, total_weight),
        });
        self.nodes.len() - 1
    }

    fn class_weights(&self, indices: &[usize]) -> (Vec<f64>, f64) {
        let mut class_weights = vec![0.0; Category::COUNT];
        let mut total = 0.0;
        for &i in indices {
            class_weights[self.targets[i].index()] += self.weights[i];
            total += self.weights[i];
        }
        (class_weights, total)
    }

    /// Find the best gini-decrease split over a random feature subset.
    fn best_split(
        &self,
        indices: &[usize],
        class_weights: &[f64],
        total_weight: f64,
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let impurity = gini(class_weights, total_weight);
        let n_candidates = ((self.n_features as f64).sqrt().round() as usize).max(1);
        let features = rand::seq::index::sample(rng, self.n_features, n_candidates);

        let mut best: Option<SplitCandidate> = None;
        for feature in features {
            // Sort samples by feature value, then scan thresholds between
            // distinct consecutive values.
            let mut ordered: Vec<usize> = indices.to_vec();
            ordered.sort_by(|&a, &b| {
                self.rows[a][feature]
                    .partial_cmp(&self.rows[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_weights = vec![0.0; Category::COUNT];
            let mut left_total = 0.0;
            for (position, window) in ordered.windows(2).enumerate() {
                let (current, next) = (window[0], window[1]);
                left_weights[self.targets[current].index()] += self.weights[current];
                left_total += self.weights[current];

                let value = self.rows[current][feature];
                let next_value = self.rows[next][feature];
                if next_value <= value {
                    continue;
                }
                let left_count = position + 1;
                let right_count = ordered.len() - left_count;
                if left_count < self.params.min_samples_leaf
                    || right_count < self.params.min_samples_leaf
                {
                    continue;
                }

                let right_total = total_weight - left_total;
                let right_weights: Vec<f64> = class_weights
                    .iter()
                    .zip(&left_weights)
                    .map(|(all, left)| all - left)
                    .collect();

                let weighted_child_impurity = (left_total / total_weight)
                    * gini(&left_weights, left_total)
                    + (right_total / total_weight) * gini(&right_weights, right_total);
                let decrease = impurity - weighted_child_impurity;

                let is_better = best
                    .as_ref()
                    .map(|b| decrease > b.decrease)
                    .unwrap_or(decrease > 1e-12);
                if is_better {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (value + next_value) / 2.0,
                        decrease,
                    });
                }
            }
        }
        best
    }
}

fn gini(class_weights: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - class_weights
        .iter()
        .map(|w| {
            let p = w / total;
            p * p
        })
        .sum::<f64>()
}

fn leaf_distribution(class_weights: &[f64], total: f64) -> Vec<f64> {
    if total <= 0.0 {
        // Degenerate leaf; spread mass uniformly rather than divide by zero.
        return vec![1.0 / Category::COUNT as f64; Category::COUNT];
    }
    class_weights.iter().map(|w| w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two linearly separable blobs on feature 0.
    fn blob_data() -> (Vec<Vec<f64>>, Vec<Category>, Vec<f64>) {
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 0..30 {
            let jitter = (i % 5) as f64 * 0.01;
            rows.push(vec![0.1 + jitter, 0.5]);
            targets.push(Category::Sleep);
            rows.push(vec![0.9 - jitter, 0.5]);
            targets.push(Category::Work);
        }
        let weights = vec![1.0; rows.len()];
        (rows, targets, weights)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_trees: 15,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_untrained_predict_is_error() {
        let forest = RandomForest::new(ForestParams::default());
        assert!(matches!(
            forest.predict_proba(&[0.0, 0.0]).unwrap_err(),
            AugurError::NotTrained { .. }
        ));
    }

    #[test]
    fn test_fit_separable_data() {
        let (rows, targets, weights) = blob_data();
        let mut forest = RandomForest::new(small_params());
        let accuracy = forest.fit(&rows, &targets, &weights).unwrap();
        assert!(accuracy > 0.95, "accuracy was {}", accuracy);

        // Roughly half the trees see only the uninformative dimension at
        // the root (one random candidate of two features) and fall back to
        // a mixed leaf, so the ensemble probability sits well below 1.
        let probabilities = forest.predict_proba(&[0.1, 0.5]).unwrap();
        assert!(probabilities[Category::Sleep.index()] > 0.6);
        let sum: f64 = probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_is_deterministic_under_seed() {
        let (rows, targets, weights) = blob_data();
        let mut a = RandomForest::new(small_params());
        let mut b = RandomForest::new(small_params());
        a.fit(&rows, &targets, &weights).unwrap();
        b.fit(&rows, &targets, &weights).unwrap();

        let query = vec![0.4, 0.5];
        assert_eq!(
            a.predict_proba(&query).unwrap(),
            b.predict_proba(&query).unwrap()
        );
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_feature_importances_shape() {
        let (rows, targets, weights) = blob_data();
        let mut forest = RandomForest::new(small_params());
        forest.fit(&rows, &targets, &weights).unwrap();

        let importances = forest.feature_importances();
        assert_eq!(importances.len(), 2);
        let sum: f64 = importances.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        // The separating dimension dominates.
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn test_weights_shift_the_leaf_distributions(){
        // Same point labeled two ways; weights decide which class wins.
        let rows = vec![vec![0.5], vec![0.5], vec![0.5], vec![0.5]];
        let targets = vec![
            Category::Sleep,
            Category::Sleep,
            Category::Work,
            Category::Work,
        ];
        let weights = vec![0.05, 0.05, 10.0, 10.0];
        let mut forest = RandomForest::new(small_params());
        forest.fit(&rows, &targets, &weights).unwrap();

        let probabilities = forest.predict_proba(&[0.5]).unwrap();
        assert!(probabilities[Category::Work.index()] > probabilities[Category::Sleep.index()]);
    }

    #[test]
    fn test_zero_samples_is_error() {
        let mut forest = RandomForest::new(small_params());
        assert!(forest.fit(&[], &[], &[]).is_err());
    }

    #[test]
    fn test_serde_round_trip_preserves_predictions() {
        let (rows, targets, weights) = blob_data();
        let mut forest = RandomForest::new(small_params());
        forest.fit(&rows, &targets, &weights).unwrap();

        let json = serde_json::to_string(&forest).unwrap();
        let restored: RandomForest = serde_json::from_str(&json).unwrap();
        let query = vec![0.25, 0.5];
        assert_eq!(
            forest.predict_proba(&query).unwrap(),
            restored.predict_proba(&query).unwrap()
        );
    }
}
