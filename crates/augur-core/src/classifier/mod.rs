//! Classification strategies.
//!
//! Two strategies share one prediction surface: the online strategy folds
//! each observation into a naive Bayes model immediately, while the batch
//! strategy records observations and refits a random forest over the whole
//! accumulated history on demand. The engine, feature extractor, and
//! memory buffer are written once against this seam.

mod forest;
mod naive_bayes;

pub use forest::{ForestParams, RandomForest};
pub use naive_bayes::MultinomialNb;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AugurError, AugurResult};
use crate::features::MinMaxScaler;
use crate::types::{Category, CategoryScore};

/// Shared prediction capability of both classifier kinds.
pub trait Classifier {
    /// Whether the model can serve predictions.
    fn is_trained(&self) -> bool;

    /// Probability distribution over the full category set, indexed by
    /// `Category::index()`.
    fn predict_proba(&self, features: &[f64]) -> AugurResult<Vec<f64>>;
}

impl Classifier for MultinomialNb {
    fn is_trained(&self) -> bool {
        MultinomialNb::is_trained(self)
    }

    fn predict_proba(&self, features: &[f64]) -> AugurResult<Vec<f64>> {
        MultinomialNb::predict_proba(self, features)
    }
}

impl Classifier for RandomForest {
    fn is_trained(&self) -> bool {
        RandomForest::is_trained(self)
    }

    fn predict_proba(&self, features: &[f64]) -> AugurResult<Vec<f64>> {
        RandomForest::predict_proba(self, features)
    }
}

/// Which strategy an engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Online,
    Batch,
}

/// One sample retained for batch retraining: unscaled features, the target
/// category, and when the observation occurred (drives recency weighting).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRow {
    pub features: Vec<f64>,
    pub target: Category,
    pub timestamp: DateTime<Utc>,
}

/// Batch strategy state: pending training rows plus the currently
/// published forest, if any. `record` never touches the forest; only
/// `install` swaps in freshly fitted parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStrategy {
    params: ForestParams,
    pending: Vec<TrainingRow>,
    forest: Option<RandomForest>,
    /// Training accuracy of the last retrain, for stats.
    last_accuracy: Option<f64>,
}

impl BatchStrategy {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            pending: Vec::new(),
            forest: None,
            last_accuracy: None,
        }
    }

    /// Record one sample for the next retrain.
    pub fn record(&mut self, row: TrainingRow) {
        self.pending.push(row);
    }

    /// Number of rows awaiting the next retrain.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Clone the accumulated training rows (the retrain snapshot).
    pub fn training_rows(&self) -> Vec<TrainingRow> {
        self.pending.clone()
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Training accuracy reported by the last retrain.
    pub fn last_accuracy(&self) -> Option<f64> {
        self.last_accuracy
    }

    /// Per-dimension importance scores of the published forest.
    pub fn feature_importances(&self) -> Option<&[f64]> {
        self.forest.as_ref().map(|f| f.feature_importances())
    }

    /// Publish a fitted forest, replacing the previous one whole.
    pub fn install(&mut self, forest: RandomForest, accuracy: f64) {
        self.forest = Some(forest);
        self.last_accuracy = Some(accuracy);
    }
}

impl Classifier for BatchStrategy {
    fn is_trained(&self) -> bool {
        self.forest.is_some()
    }

    fn predict_proba(&self, features: &[f64]) -> AugurResult<Vec<f64>> {
        match &self.forest {
            Some(forest) => forest.predict_proba(features),
            None => Err(AugurError::not_trained()),
        }
    }
}

/// Serializable strategy selector. The tag makes persisted snapshots
/// self-describing, so a blob saved by one strategy is never silently
/// loaded into the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Strategy {
    Online(MultinomialNb),
    Batch(BatchStrategy),
}

impl Strategy {
    pub fn new(kind: StrategyKind, params: ForestParams) -> Self {
        match kind {
            StrategyKind::Online => Strategy::Online(MultinomialNb::new()),
            StrategyKind::Batch => Strategy::Batch(BatchStrategy::new(params)),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Online(_) => StrategyKind::Online,
            Strategy::Batch(_) => StrategyKind::Batch,
        }
    }
}

impl Classifier for Strategy {
    fn is_trained(&self) -> bool {
        match self {
            Strategy::Online(model) => model.is_trained(),
            Strategy::Batch(batch) => batch.is_trained(),
        }
    }

    fn predict_proba(&self, features: &[f64]) -> AugurResult<Vec<f64>> {
        match self {
            Strategy::Online(model) => model.predict_proba(features),
            Strategy::Batch(batch) => batch.predict_proba(features),
        }
    }
}

/// Output of a batch fit, built off to the side and published atomically.
#[derive(Debug, Clone)]
pub struct FittedBatchModel {
    pub forest: RandomForest,
    pub scaler: MinMaxScaler,
    pub accuracy: f64,
}

/// Fit a forest over a snapshot of training rows.
///
/// Pure with respect to live engine state: takes copies in, hands a fully
/// built model out, so a slow fit can run outside the engine lock and the
/// result can be swapped in whole. The scaler is fitted here if it never
/// was (the very first batch of features seen); an already-fitted scaler
/// is reused unchanged.
pub fn fit_batch_model(
    rows: &[TrainingRow],
    scaler: &MinMaxScaler,
    params: &ForestParams,
) -> AugurResult<FittedBatchModel> {
    if rows.is_empty() {
        return Err(AugurError::Configuration(
            "no training rows recorded; learn some observations before retraining".to_string(),
        ));
    }

    let mut scaler = scaler.clone();
    if !scaler.is_fitted() {
        let matrix: Vec<Vec<f64>> = rows.iter().map(|r| r.features.clone()).collect();
        scaler.fit(&matrix)?;
    }

    let mut scaled = Vec::with_capacity(rows.len());
    let mut targets = Vec::with_capacity(rows.len());
    for row in rows {
        let transformed: Vec<f64> = scaler.transform(&row.features)?.iter().map(|v| v.abs()).collect();
        scaled.push(transformed);
        targets.push(row.target);
    }
    let weights = sample_weights(rows);

    let mut forest = RandomForest::new(params.clone());
    let accuracy = forest.fit(&scaled, &targets, &weights)?;
    Ok(FittedBatchModel {
        forest,
        scaler,
        accuracy,
    })
}

/// Per-sample training weights: exponential recency decay relative to the
/// newest sample (7-day half-life), multiplied by a class-balance factor
/// so rare categories are not drowned out.
fn sample_weights(rows: &[TrainingRow]) -> Vec<f64> {
    let newest = rows
        .iter()
        .map(|r| r.timestamp)
        .max()
        .expect("rows checked non-empty");

    let mut class_counts = vec![0usize; Category::COUNT];
    for row in rows {
        class_counts[row.target.index()] += 1;
    }
    let present_classes = class_counts.iter().filter(|&&c| c > 0).count().max(1);

    rows.iter()
        .map(|row| {
            let days = (newest - row.timestamp).num_days() as f64;
            let recency = (-days / 7.0).exp();
            let balance =
                rows.len() as f64 / (present_classes * class_counts[row.target.index()]) as f64;
            recency * balance
        })
        .collect()
}

/// Rank categories by probability, descending, ties broken by the
/// category's position in the fixed ordering. Returns at most `k` entries.
pub fn ranked_predictions(probabilities: &[f64], k: usize) -> Vec<CategoryScore> {
    let mut ranked: Vec<CategoryScore> = probabilities
        .iter()
        .enumerate()
        .filter_map(|(i, &p)| {
            Category::from_index(i).map(|category| CategoryScore {
                category,
                probability: p,
            })
        })
        .collect();
    // Stable sort keeps the fixed category order for equal probabilities.
    ranked.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(day: u32, slot: usize, target: Category) -> TrainingRow {
        let mut features = vec![0.0; 4];
        features[slot] = 1.0;
        TrainingRow {
            features,
            target,
            timestamp: Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_ranked_predictions_sorted_and_truncated() {
        let mut probabilities = vec![0.0; Category::COUNT];
        probabilities[Category::Sleep.index()] = 0.5;
        probabilities[Category::Work.index()] = 0.3;
        probabilities[Category::Study.index()] = 0.2;

        let top = ranked_predictions(&probabilities, 3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].category, Category::Sleep);
        assert_eq!(top[1].category, Category::Work);
        assert_eq!(top[2].category, Category::Study);
        assert!(top[0].probability >= top[1].probability);
    }

    #[test]
    fn test_ranked_predictions_ties_follow_category_order() {
        let probabilities = vec![0.1; Category::COUNT];
        let top = ranked_predictions(&probabilities, 3);
        let expected: Vec<Category> = Category::all().into_iter().take(3).collect();
        let got: Vec<Category> = top.iter().map(|s| s.category).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_strategy_tagging_in_snapshots() {
        let online = Strategy::new(StrategyKind::Online, ForestParams::default());
        let json = serde_json::to_string(&online).unwrap();
        assert!(json.contains("\"mode\":\"online\""));

        let batch = Strategy::new(StrategyKind::Batch, ForestParams::default());
        let json = serde_json::to_string(&batch).unwrap();
        assert!(json.contains("\"mode\":\"batch\""));
    }

    #[test]
    fn test_batch_record_does_not_train() {
        let mut batch = BatchStrategy::new(ForestParams::default());
        batch.record(row(1, 0, Category::Sleep));
        batch.record(row(1, 1, Category::Work));
        assert!(!batch.is_trained());
        assert_eq!(batch.pending_len(), 2);
        assert!(batch.predict_proba(&[0.0; 4]).is_err());
    }

    #[test]
    fn test_fit_batch_model_and_install() {
        let mut batch = BatchStrategy::new(ForestParams {
            n_trees: 10,
            ..ForestParams::default()
        });
        for day in 1..15 {
            batch.record(row(day, 0, Category::Sleep));
            batch.record(row(day, 2, Category::Work));
        }

        let scaler = MinMaxScaler::new();
        let fitted =
            fit_batch_model(&batch.training_rows(), &scaler, batch.params()).unwrap();
        assert!(fitted.scaler.is_fitted());
        assert!(fitted.accuracy > 0.9);

        let accuracy = fitted.accuracy;
        batch.install(fitted.forest, accuracy);
        assert!(batch.is_trained());
        assert_eq!(batch.last_accuracy(), Some(accuracy));

        let query: Vec<f64> = fitted
            .scaler
            .transform(&[1.0, 0.0, 0.0, 0.0])
            .unwrap()
            .iter()
            .map(|v| v.abs())
            .collect();
        let probabilities = batch.predict_proba(&query).unwrap();
        assert!(probabilities[Category::Sleep.index()] > probabilities[Category::Work.index()]);
    }

    #[test]
    fn test_fit_batch_model_empty_rows_is_error() {
        let err =
            fit_batch_model(&[], &MinMaxScaler::new(), &ForestParams::default()).unwrap_err();
        assert!(matches!(err, AugurError::Configuration(_)));
    }

    #[test]
    fn test_sample_weights_decay_with_age() {
        let rows = vec![row(1, 0, Category::Sleep), row(15, 0, Category::Sleep)];
        let weights = sample_weights(&rows);
        // 14 days old at 7-day half-life: exp(-2) of the newest weight.
        assert!(weights[0] < weights[1]);
        assert!((weights[0] / weights[1] - (-2.0f64).exp()).abs() < 1e-9);
    }
}
