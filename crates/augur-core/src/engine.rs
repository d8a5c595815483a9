//! The prediction engine.
//!
//! Composes the category mapper, feature extractor, scaler, classification
//! strategy, and memory buffer behind the five public operations: learn,
//! bulk learn, predict, reset, stats, plus snapshot persistence.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::classifier::{
    fit_batch_model, ranked_predictions, Classifier, FittedBatchModel, ForestParams, Strategy,
    TrainingRow,
};
use crate::config::PredictorConfig;
use crate::error::{AugurError, AugurResult};
use crate::features::{FeatureExtractor, MinMaxScaler};
use crate::memory::MemoryBuffer;
use crate::persistence::{load_snapshot, save_snapshot, ModelSnapshot, FORMAT_VERSION};
use crate::types::{sort_chronologically, Category, EngineStats, Observation, Prediction};

/// Ranked predictions returned per predict call.
const TOP_K: usize = 3;

/// Inputs for a batch refit, cloned out of the engine so the fit can run
/// without holding any lock on live state.
#[derive(Debug, Clone)]
pub struct RetrainSnapshot {
    pub rows: Vec<TrainingRow>,
    pub scaler: MinMaxScaler,
    pub params: ForestParams,
}

/// Behavior prediction engine.
///
/// Starts `Empty`; the first successful learn under the online strategy
/// (or the first published retrain under the batch strategy) moves it to
/// `Trained`, where `predict` becomes legal. `reset` returns it to
/// `Empty`. Construction attempts to restore persisted state from the
/// configured model path and silently starts empty when nothing usable
/// is found.
///
/// The engine is deliberately synchronous and not internally locked;
/// hosts serialize access to it (one request-serving process with a
/// single lock around these operations is the intended deployment).
#[derive(Debug)]
pub struct PredictorEngine {
    config: PredictorConfig,
    extractor: FeatureExtractor,
    scaler: MinMaxScaler,
    strategy: Strategy,
    memory: MemoryBuffer,
    total_entries_learned: u64,
    predictions_made: u64,
}

impl PredictorEngine {
    /// Create an engine, restoring persisted state if a usable snapshot
    /// exists at the configured model path.
    pub fn new(config: PredictorConfig) -> Self {
        let mut engine = Self::empty(config);
        match load_snapshot(&engine.config.model_path) {
            Ok(Some(snapshot)) => {
                if snapshot.strategy.kind() == engine.config.strategy {
                    engine.restore(snapshot);
                    info!(
                        path = %engine.config.model_path.display(),
                        entries = engine.total_entries_learned,
                        "restored model snapshot"
                    );
                } else {
                    warn!(
                        path = %engine.config.model_path.display(),
                        "snapshot strategy does not match configuration, starting empty"
                    );
                }
            }
            Ok(None) => {
                info!(
                    path = %engine.config.model_path.display(),
                    "no saved model found, starting empty"
                );
            }
            Err(e) => {
                warn!(
                    path = %engine.config.model_path.display(),
                    error = %e,
                    "ignoring unusable model snapshot, starting empty"
                );
            }
        }
        engine
    }

    /// Create an engine without touching the model path.
    pub fn empty(config: PredictorConfig) -> Self {
        let strategy = Strategy::new(config.strategy, config.forest.clone());
        let memory = MemoryBuffer::new(config.memory_capacity);
        Self {
            config,
            extractor: FeatureExtractor::new(),
            scaler: MinMaxScaler::new(),
            strategy,
            memory,
            total_entries_learned: 0,
            predictions_made: 0,
        }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// The memory buffer holding recent observations.
    pub fn memory(&self) -> &MemoryBuffer {
        &self.memory
    }

    /// Whether `predict` is currently legal.
    pub fn is_trained(&self) -> bool {
        self.strategy.is_trained()
    }

    /// Learn from a single observation.
    ///
    /// Failures local to the observation (unusable window, extraction
    /// error) are absorbed: logged, and reported as `false`. The
    /// observation is retained in the memory buffer either way, matching
    /// its role as prediction context rather than training data.
    pub fn learn(&mut self, observation: Observation) -> bool {
        match self.try_learn(observation) {
            Ok(target) => {
                debug!(
                    entry = self.total_entries_learned,
                    category = %target,
                    "learned observation"
                );
                true
            }
            Err(e) => {
                warn!(error = %e, "skipping observation");
                false
            }
        }
    }

    fn try_learn(&mut self, observation: Observation) -> AugurResult<Category> {
        let occurred_at = observation.timestamp.unwrap_or_else(Utc::now);
        let blank_action = observation.action.trim().is_empty();
        self.memory.push(observation);
        if blank_action {
            return Err(AugurError::unparseable(
                "observation has no action label to learn a category from",
            ));
        }

        let window = self.memory.window(self.config.context_window);
        let (features, target) = self.extractor.extract(&window)?;

        match &mut self.strategy {
            Strategy::Online(model) => {
                // The scaler's parameters are fixed by the very first
                // features seen; refitting later would invalidate what the
                // model has already learned.
                if !self.scaler.is_fitted() {
                    self.scaler.fit(std::slice::from_ref(&features))?;
                }
                let scaled = non_negative(self.scaler.transform(&features)?);
                model.partial_fit(&scaled, target)?;
            }
            Strategy::Batch(batch) => {
                // Recorded for the next retrain; fitted parameters are
                // untouched until then.
                batch.record(TrainingRow {
                    features,
                    target,
                    timestamp: occurred_at,
                });
            }
        }

        self.total_entries_learned += 1;
        if self.config.autosave {
            if let Err(e) = self.save() {
                warn!(error = %e, "autosave failed");
            }
        }
        Ok(target)
    }

    /// Learn from many observations in chronological order.
    ///
    /// Sorts the input by timestamp first, so the end state matches
    /// calling `learn` one-by-one in chronological order. Returns how
    /// many observations were learned; per-observation failures are
    /// skipped without aborting the batch.
    pub fn bulk_learn(&mut self, mut observations: Vec<Observation>) -> usize {
        sort_chronologically(&mut observations);
        let total = observations.len();

        let mut learned = 0;
        for observation in observations {
            if self.learn(observation) {
                learned += 1;
            }
        }
        info!(learned, total, "bulk learn finished");
        learned
    }

    /// Predict the next activity category.
    ///
    /// Uses the supplied window when given, otherwise the most recent
    /// entries from the memory buffer. Fails with
    /// [`AugurError::NotTrained`] before any learning has occurred and
    /// with [`AugurError::EmptyWindow`] when no context is available.
    pub fn predict(&mut self, recent: Option<&[Observation]>) -> AugurResult<Prediction> {
        if !self.strategy.is_trained() {
            return Err(AugurError::not_trained());
        }

        let window: Vec<Observation> = match recent {
            Some([]) => {
                return Err(AugurError::empty_window("empty recent-observations list"))
            }
            Some(observations) => observations.to_vec(),
            None => {
                if self.memory.is_empty() {
                    return Err(AugurError::empty_window(
                        "memory buffer is empty and no recent observations were supplied",
                    ));
                }
                self.memory.window(self.config.context_window)
            }
        };

        let (features, _) = self.extractor.extract(&window)?;
        let scaled = non_negative(self.scaler.transform(&features)?);
        let probabilities = self.strategy.predict_proba(&scaled)?;

        let top_predictions = ranked_predictions(&probabilities, TOP_K);
        let best = top_predictions
            .first()
            .ok_or_else(|| AugurError::Internal("empty probability distribution".to_string()))?;

        self.predictions_made += 1;
        Ok(Prediction {
            predicted_action: best.category,
            confidence: best.probability,
            top_predictions: top_predictions.clone(),
            timestamp: Utc::now(),
            total_learned: self.total_entries_learned,
            predictions_made: self.predictions_made,
        })
    }

    /// Refit the batch strategy's forest over all recorded rows and
    /// publish it. Returns training accuracy.
    ///
    /// Convenience wrapper over [`training_snapshot`] →
    /// [`fit_batch_model`] → [`install_batch_model`]; hosts that must not
    /// block concurrent readers run those three steps themselves with the
    /// fit outside the lock.
    ///
    /// [`training_snapshot`]: Self::training_snapshot
    /// [`install_batch_model`]: Self::install_batch_model
    pub fn retrain(&mut self) -> AugurResult<f64> {
        let snapshot = self.training_snapshot()?;
        let fitted = fit_batch_model(&snapshot.rows, &snapshot.scaler, &snapshot.params)?;
        let accuracy = fitted.accuracy;
        self.install_batch_model(fitted)?;
        Ok(accuracy)
    }

    /// Clone out everything a batch refit needs.
    ///
    /// Fails under the online strategy, which has no retrain cycle.
    pub fn training_snapshot(&self) -> AugurResult<RetrainSnapshot> {
        match &self.strategy {
            Strategy::Batch(batch) => Ok(RetrainSnapshot {
                rows: batch.training_rows(),
                scaler: self.scaler.clone(),
                params: batch.params().clone(),
            }),
            Strategy::Online(_) => Err(AugurError::Configuration(
                "retraining applies to the batch strategy; the online strategy updates on every learn"
                    .to_string(),
            )),
        }
    }

    /// Publish a fitted batch model, replacing the previous parameters
    /// whole. In-flight state is never partially overwritten: the scaler
    /// and forest swap in together.
    pub fn install_batch_model(&mut self, fitted: FittedBatchModel) -> AugurResult<()> {
        match &mut self.strategy {
            Strategy::Batch(batch) => {
                let accuracy = fitted.accuracy;
                self.scaler = fitted.scaler;
                batch.install(fitted.forest, accuracy);
                info!(accuracy, "published retrained forest");
                Ok(())
            }
            Strategy::Online(_) => Err(AugurError::Configuration(
                "cannot install a batch model into the online strategy".to_string(),
            )),
        }
    }

    /// Feature-importance scores of the published forest, labeled by
    /// feature name. `None` for the online strategy or before the first
    /// retrain.
    pub fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        match &self.strategy {
            Strategy::Batch(batch) => batch.feature_importances().map(|importances| {
                FeatureExtractor::feature_names()
                    .into_iter()
                    .zip(importances.iter().copied())
                    .collect()
            }),
            Strategy::Online(_) => None,
        }
    }

    /// Training accuracy reported by the last retrain, if any.
    pub fn last_training_accuracy(&self) -> Option<f64> {
        match &self.strategy {
            Strategy::Batch(batch) => batch.last_accuracy(),
            Strategy::Online(_) => None,
        }
    }

    /// Clear all learned state back to construction-time defaults.
    pub fn reset(&mut self) {
        self.strategy = Strategy::new(self.config.strategy, self.config.forest.clone());
        self.scaler = MinMaxScaler::new();
        self.memory.clear();
        self.total_entries_learned = 0;
        self.predictions_made = 0;
        info!("model reset to empty state");
    }

    /// Current counters and configuration.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            trained: self.strategy.is_trained(),
            total_entries_learned: self.total_entries_learned,
            predictions_made: self.predictions_made,
            memory_size: self.memory.len(),
            max_memory_size: self.memory.capacity(),
            categories: Category::all_names().into_iter().map(String::from).collect(),
        }
    }

    /// Build a snapshot of the full model state.
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            version: FORMAT_VERSION,
            categories: Category::all_names().into_iter().map(String::from).collect(),
            strategy: self.strategy.clone(),
            scaler: self.scaler.clone(),
            memory: self.memory.clone(),
            total_entries_learned: self.total_entries_learned,
            predictions_made: self.predictions_made,
            saved_at: Utc::now(),
        }
    }

    /// Persist the full model state to the configured path.
    ///
    /// A failure is reported to the caller; in-memory state is unaffected.
    pub fn save(&self) -> AugurResult<()> {
        save_snapshot(&self.snapshot(), &self.config.model_path)?;
        debug!(path = %self.config.model_path.display(), "model snapshot saved");
        Ok(())
    }

    fn restore(&mut self, snapshot: ModelSnapshot) {
        self.strategy = snapshot.strategy;
        self.scaler = snapshot.scaler;
        // Re-buffer under the configured capacity rather than adopting the
        // snapshot's, so a capacity change takes effect on restart.
        self.memory = MemoryBuffer::new(self.config.memory_capacity);
        for observation in snapshot.memory.iter() {
            self.memory.push(observation.clone());
        }
        self.total_entries_learned = snapshot.total_entries_learned;
        self.predictions_made = snapshot.predictions_made;
    }
}

fn non_negative(values: Vec<f64>) -> Vec<f64> {
    values.into_iter().map(f64::abs).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_config() -> PredictorConfig {
        // Point the model path into a throwaway directory so constructor
        // load attempts never touch a real home directory.
        let dir = std::env::temp_dir().join("augur-engine-unit-tests");
        PredictorConfig::default().with_model_path(dir.join("never-saved.json"))
    }

    fn obs(day: u32, hour: u32, action: &str, duration: u32) -> Observation {
        Observation::new(
            Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap(),
            action,
            duration,
        )
    }

    #[test]
    fn test_empty_engine_is_untrained() {
        let engine = PredictorEngine::empty(test_config());
        assert!(!engine.is_trained());
        let stats = engine.stats();
        assert!(!stats.trained);
        assert_eq!(stats.total_entries_learned, 0);
        assert_eq!(stats.memory_size, 0);
        assert_eq!(stats.categories.len(), Category::COUNT);
    }

    #[test]
    fn test_predict_before_learn_is_not_trained() {
        let mut engine = PredictorEngine::empty(test_config());
        let err = engine.predict(None).unwrap_err();
        assert!(matches!(err, AugurError::NotTrained { .. }));
    }

    #[test]
    fn test_first_learn_trains_online_engine() {
        let mut engine = PredictorEngine::empty(test_config());
        assert!(engine.learn(obs(2, 7, "Sleep", 480)));
        assert!(engine.is_trained());
        assert!(engine.predict(None).is_ok());
    }

    #[test]
    fn test_reset_restores_construction_state() {
        let mut engine = PredictorEngine::empty(test_config());
        engine.learn(obs(2, 7, "Sleep", 480));
        engine.learn(obs(2, 15, "Duties", 30));
        engine.predict(None).unwrap();

        engine.reset();
        let stats = engine.stats();
        assert!(!stats.trained);
        assert_eq!(stats.total_entries_learned, 0);
        assert_eq!(stats.predictions_made, 0);
        assert_eq!(stats.memory_size, 0);
        assert!(matches!(
            engine.predict(None).unwrap_err(),
            AugurError::NotTrained { .. }
        ));
    }

    #[test]
    fn test_blank_action_is_soft_skip() {
        let mut engine = PredictorEngine::empty(test_config());
        let blank = Observation::new(
            Utc.with_ymd_and_hms(2025, 6, 2, 7, 0, 0).unwrap(),
            "   ",
            10,
        );
        assert!(!engine.learn(blank));
        // The entry is kept as context but nothing was learned.
        assert_eq!(engine.stats().total_entries_learned, 0);
        assert_eq!(engine.stats().memory_size, 1);
        assert!(!engine.is_trained());
    }

    #[test]
    fn test_bulk_learn_skips_bad_entries_and_continues() {
        let mut engine = PredictorEngine::empty(test_config());
        let entries = vec![
            obs(2, 7, "Sleep", 480),
            Observation::new(Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap(), "", 5),
            obs(2, 9, "Work", 240),
        ];
        assert_eq!(engine.bulk_learn(entries), 2);
        assert_eq!(engine.stats().total_entries_learned, 2);
    }

    #[test]
    fn test_explicit_empty_window_is_error() {
        let mut engine = PredictorEngine::empty(test_config());
        engine.learn(obs(2, 7, "Sleep", 480));
        let err = engine.predict(Some(&[])).unwrap_err();
        assert!(matches!(err, AugurError::EmptyWindow { .. }));
    }

    #[test]
    fn test_online_retrain_is_configuration_error() {
        let mut engine = PredictorEngine::empty(test_config());
        engine.learn(obs(2, 7, "Sleep", 480));
        assert!(matches!(
            engine.retrain().unwrap_err(),
            AugurError::Configuration(_)
        ));
        assert!(engine.training_snapshot().is_err());
        assert!(engine.feature_importances().is_none());
    }
}
