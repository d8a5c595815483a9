//! augur-core - Core library for augur.
//!
//! This crate provides the behavior prediction engine: a classifier that
//! predicts a person's next journal activity category from a short history
//! of recent entries, updating itself one observation at a time.
//!
//! # Example
//!
//! ```ignore
//! use augur_core::{Observation, PredictorConfig, PredictorEngine};
//! use chrono::Utc;
//!
//! let mut engine = PredictorEngine::new(PredictorConfig::default());
//!
//! // Learn from an entry
//! engine.learn(Observation::new(Utc::now(), "Sleep", 480));
//!
//! // Predict the next activity category
//! let prediction = engine.predict(None)?;
//! println!("{} ({:.0}%)", prediction.predicted_action, prediction.confidence * 100.0);
//! ```

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod memory;
pub mod persistence;
pub mod types;

// Re-export commonly used types
pub use classifier::{
    fit_batch_model, Classifier, FittedBatchModel, ForestParams, MultinomialNb, RandomForest,
    Strategy, StrategyKind, TrainingRow,
};
pub use config::PredictorConfig;
pub use engine::{PredictorEngine, RetrainSnapshot};
pub use error::{AugurError, AugurResult};
pub use features::{FeatureExtractor, MinMaxScaler, FEATURE_DIM};
pub use memory::MemoryBuffer;
pub use persistence::{load_snapshot, save_snapshot, ModelSnapshot, FORMAT_VERSION};
pub use types::{
    sort_chronologically, Category, CategoryScore, EngineStats, Observation, Prediction,
};
