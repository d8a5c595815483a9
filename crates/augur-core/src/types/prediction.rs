//! Prediction results and engine statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::Category;

/// One entry in the ranked prediction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    pub probability: f64,
}

/// Result of a single `predict` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Most probable next activity category.
    pub predicted_action: Category,
    /// Maximum probability across all categories.
    pub confidence: f64,
    /// Top categories by probability, descending. Ties are broken by the
    /// category's position in the fixed ordering. At most three entries.
    pub top_predictions: Vec<CategoryScore>,
    /// When the prediction was produced.
    pub timestamp: DateTime<Utc>,
    /// Observations learned so far.
    pub total_learned: u64,
    /// Predictions made so far, including this one.
    pub predictions_made: u64,
}

/// Snapshot of engine counters and configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    /// Whether the model can serve predictions.
    pub trained: bool,
    pub total_entries_learned: u64,
    pub predictions_made: u64,
    /// Observations currently held in the memory buffer.
    pub memory_size: usize,
    pub max_memory_size: usize,
    /// The full category universe, in the fixed ordering.
    pub categories: Vec<String>,
}
