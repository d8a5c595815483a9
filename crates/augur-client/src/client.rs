//! Client implementation for the augur REST API.

use augur_core::error::{AugurError, AugurResult};
use augur_core::types::{EngineStats, Observation, Prediction};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Client for the augur prediction API.
pub struct PredictorClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LearnResult {
    pub success: bool,
    pub message: String,
    pub total_learned: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrainResult {
    pub success: bool,
    pub accuracy: f64,
    pub samples: usize,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    success: bool,
    #[allow(dead_code)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    trained: bool,
}

impl PredictorClient {
    /// Create a client against the given base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client from the `AUGUR_BASE_URL` environment variable,
    /// defaulting to a local server.
    pub fn from_env() -> Self {
        let base_url = std::env::var("AUGUR_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
        Self::new(&base_url)
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> AugurResult<T> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .map_err(|e| AugurError::api(format!("request to {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(AugurError::api(format!(
                "{} returned {}: {}",
                path, status, error
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AugurError::api(format!("failed to parse {} response: {}", path, e)))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> AugurResult<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|e| AugurError::api(format!("request to {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(AugurError::api(format!(
                "{} returned {}: {}",
                path, status, error
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AugurError::api(format!("failed to parse {} response: {}", path, e)))
    }

    /// Whether the server is up and its model is trained.
    pub async fn health(&self) -> AugurResult<bool> {
        let health: HealthResponse = self.get("/health").await?;
        if health.status != "healthy" {
            return Err(AugurError::api(format!(
                "server reported status {:?}",
                health.status
            )));
        }
        Ok(health.trained)
    }

    /// Learn from a single entry.
    pub async fn learn(&self, entry: &Observation) -> AugurResult<LearnResult> {
        self.post("/learn", json!({ "entry": entry })).await
    }

    /// Learn from many entries; the server sorts them chronologically.
    pub async fn bulk_learn(&self, entries: &[Observation]) -> AugurResult<LearnResult> {
        self.post("/learn/bulk", json!({ "entries": entries })).await
    }

    /// Predict the next activity category.
    ///
    /// Pass `recent_entries` to supply explicit context; otherwise the
    /// server predicts from its own memory buffer.
    pub async fn predict(
        &self,
        recent_entries: Option<&[Observation]>,
    ) -> AugurResult<Prediction> {
        let body = match recent_entries {
            Some(entries) => json!({ "recent_entries": entries }),
            None => json!({}),
        };
        self.post("/predict", body).await
    }

    /// Fetch engine statistics.
    pub async fn stats(&self) -> AugurResult<EngineStats> {
        self.get("/stats").await
    }

    /// Trigger a batch retrain.
    pub async fn train(&self) -> AugurResult<TrainResult> {
        self.post("/train", json!({})).await
    }

    /// Reset the server's model to its empty state.
    pub async fn reset(&self) -> AugurResult<()> {
        let ack: AckResponse = self.post("/reset", json!({})).await?;
        if !ack.success {
            return Err(AugurError::api("reset was not acknowledged"));
        }
        Ok(())
    }

    /// Ask the server to persist its model snapshot.
    pub async fn save(&self) -> AugurResult<()> {
        let ack: AckResponse = self.post("/save", json!({})).await?;
        if !ack.success {
            return Err(AugurError::api("save was not acknowledged"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = PredictorClient::new("http://localhost:8080/");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_api_error() {
        // Port 9 (discard) is never serving HTTP.
        let client = PredictorClient::new("http://127.0.0.1:9");
        let err = client.stats().await.unwrap_err();
        assert!(matches!(err, AugurError::Api { .. }));
    }
}
