//! Prediction engine endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use augur_core::{fit_batch_model, save_snapshot, EngineStats, Observation, Prediction};

/// Request body for learning from a single entry.
#[derive(Debug, Deserialize)]
pub struct LearnRequest {
    /// New entry to learn from.
    pub entry: Observation,
}

/// Request body for learning from many entries.
#[derive(Debug, Deserialize)]
pub struct BulkLearnRequest {
    /// Entries to learn from, in any order; they are sorted by timestamp
    /// before learning.
    pub entries: Vec<Observation>,
}

/// Response for learn operations.
#[derive(Debug, Serialize)]
pub struct LearnResponse {
    pub success: bool,
    pub message: String,
    pub total_learned: u64,
}

/// Request body for predictions.
#[derive(Debug, Deserialize, Default)]
pub struct PredictRequest {
    /// Recent entries for context. When omitted, the engine falls back to
    /// its own memory buffer.
    pub recent_entries: Option<Vec<Observation>>,
}

/// Response for reset/save operations.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

/// Response for batch retraining.
#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub success: bool,
    pub accuracy: f64,
    pub samples: usize,
    pub feature_importance: Vec<FeatureImportance>,
}

#[derive(Debug, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Learn from a single entry.
/// POST /learn
pub async fn learn(
    State(state): State<AppState>,
    Json(request): Json<LearnRequest>,
) -> ApiResult<Json<LearnResponse>> {
    let mut engine = state.engine.write().await;
    let learned = engine.learn(request.entry);
    let total_learned = engine.stats().total_entries_learned;

    Ok(Json(LearnResponse {
        success: learned,
        message: if learned {
            format!("Learned from entry #{}", total_learned)
        } else {
            "Entry could not be learned".to_string()
        },
        total_learned,
    }))
}

/// Learn from many entries sequentially, in chronological order.
/// POST /learn/bulk
pub async fn bulk_learn(
    State(state): State<AppState>,
    Json(request): Json<BulkLearnRequest>,
) -> ApiResult<Json<LearnResponse>> {
    let submitted = request.entries.len();

    let mut engine = state.engine.write().await;
    let learned = engine.bulk_learn(request.entries);
    let total_learned = engine.stats().total_entries_learned;

    Ok(Json(LearnResponse {
        success: learned > 0,
        message: format!("Learned from {}/{} entries", learned, submitted),
        total_learned,
    }))
}

/// Predict the next activity category.
/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> ApiResult<Json<Prediction>> {
    let mut engine = state.engine.write().await;
    let prediction = engine
        .predict(request.recent_entries.as_deref())
        .map_err(ApiError::from)?;
    Ok(Json(prediction))
}

/// Engine statistics.
/// GET /stats
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<EngineStats>> {
    let engine = state.engine.read().await;
    Ok(Json(engine.stats()))
}

/// Reset the model to its empty state.
/// POST /reset
pub async fn reset(State(state): State<AppState>) -> ApiResult<Json<AckResponse>> {
    let mut engine = state.engine.write().await;
    engine.reset();
    Ok(Json(AckResponse {
        success: true,
        message: "Model reset to empty state".to_string(),
    }))
}

/// Persist the model snapshot.
/// POST /save
pub async fn save(State(state): State<AppState>) -> ApiResult<Json<AckResponse>> {
    // Snapshot under the lock, write to disk off it.
    let (snapshot, path) = {
        let engine = state.engine.read().await;
        (engine.snapshot(), engine.config().model_path.clone())
    };

    let display_path = path.display().to_string();
    tokio::task::spawn_blocking(move || save_snapshot(&snapshot, &path))
        .await
        .map_err(|e| ApiError::internal(format!("save task failed: {}", e)))?
        .map_err(ApiError::from)?;

    Ok(Json(AckResponse {
        success: true,
        message: format!("Model saved to {}", display_path),
    }))
}

/// Refit the batch strategy's forest over all recorded history.
/// POST /train
///
/// The fit runs on a cloned snapshot in a blocking task, so predictions
/// keep flowing while it works; the fitted model is swapped in whole
/// under the write lock.
pub async fn train(State(state): State<AppState>) -> ApiResult<Json<TrainResponse>> {
    let snapshot = {
        let engine = state.engine.read().await;
        engine.training_snapshot().map_err(ApiError::from)?
    };
    let samples = snapshot.rows.len();

    let fitted = tokio::task::spawn_blocking(move || {
        fit_batch_model(&snapshot.rows, &snapshot.scaler, &snapshot.params)
    })
    .await
    .map_err(|e| ApiError::internal(format!("training task failed: {}", e)))?
    .map_err(ApiError::from)?;

    let accuracy = fitted.accuracy;
    let feature_importance = {
        let mut engine = state.engine.write().await;
        engine.install_batch_model(fitted).map_err(ApiError::from)?;
        engine
            .feature_importances()
            .unwrap_or_default()
            .into_iter()
            .map(|(feature, importance)| FeatureImportance {
                feature,
                importance,
            })
            .collect()
    };

    Ok(Json(TrainResponse {
        success: true,
        accuracy,
        samples,
        feature_importance,
    }))
}
