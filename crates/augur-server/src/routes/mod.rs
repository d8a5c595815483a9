//! Route definitions for the REST API.

mod health;
mod predictor;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Learning
        .route("/learn", post(predictor::learn))
        .route("/learn/bulk", post(predictor::bulk_learn))
        // Prediction
        .route("/predict", post(predictor::predict))
        // Batch retraining
        .route("/train", post(predictor::train))
        // Model management
        .route("/stats", get(predictor::stats))
        .route("/reset", post(predictor::reset))
        .route("/save", post(predictor::save))
        // Attach state
        .with_state(state)
}

pub use health::*;
pub use predictor::*;
