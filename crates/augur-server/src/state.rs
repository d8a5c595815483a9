//! Server state management.

use std::sync::Arc;

use augur_core::engine::PredictorEngine;
use tokio::sync::RwLock;

/// Shared application state.
///
/// Every engine operation is a critical section against the shared model
/// state, so the engine sits behind one reader-writer lock: learn,
/// predict (which bumps a counter), reset, and model installation take
/// the write half; stats and retrain snapshots take the read half. The
/// engine instance is constructed at startup and injected here rather
/// than living in a process-wide global.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RwLock<PredictorEngine>>,
}

impl AppState {
    /// Wrap a pre-built engine.
    pub fn new(engine: PredictorEngine) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
        }
    }

    /// Whether the engine can currently serve predictions.
    pub async fn is_trained(&self) -> bool {
        self.engine.read().await.is_trained()
    }
}
