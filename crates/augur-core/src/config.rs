//! Configuration for the prediction engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::classifier::{ForestParams, StrategyKind};

/// Main predictor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Single path the model snapshot is saved to and loaded from.
    /// Absence of the file is a normal "start empty" condition.
    pub model_path: PathBuf,
    /// Maximum observations retained in the memory buffer.
    pub memory_capacity: usize,
    /// How many recent observations form the feature-extraction window.
    pub context_window: usize,
    /// Which classification strategy the engine runs.
    pub strategy: StrategyKind,
    /// Save a snapshot after every successful learn. Off by default;
    /// callers that want durability without the write-per-learn cost can
    /// trigger `save` themselves.
    pub autosave: bool,
    /// Hyperparameters for the batch strategy's forest.
    pub forest: ForestParams,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        let augur_dir = dirs::home_dir()
            .map(|h| h.join(".augur"))
            .unwrap_or_else(|| PathBuf::from(".augur"));

        Self {
            model_path: augur_dir.join("model.json"),
            memory_capacity: 1000,
            context_window: 10,
            strategy: StrategyKind::Online,
            autosave: false,
            forest: ForestParams::default(),
        }
    }
}

impl PredictorConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::AugurResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| crate::error::AugurError::Configuration(e.to_string())),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| crate::error::AugurError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| crate::error::AugurError::Configuration(e.to_string())),
            _ => Err(crate::error::AugurError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Use the given model path.
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    /// Use the given strategy.
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PredictorConfig::default();
        assert_eq!(config.memory_capacity, 1000);
        assert_eq!(config.context_window, 10);
        assert_eq!(config.strategy, StrategyKind::Online);
        assert!(!config.autosave);
        assert!(config.model_path.ends_with("model.json"));
    }

    #[test]
    fn test_from_file_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("augur.toml");
        std::fs::write(
            &path,
            "memory_capacity = 50\nstrategy = \"batch\"\n\n[forest]\nn_trees = 25\n",
        )
        .unwrap();

        let config = PredictorConfig::from_file(&path).unwrap();
        assert_eq!(config.memory_capacity, 50);
        assert_eq!(config.strategy, StrategyKind::Batch);
        assert_eq!(config.forest.n_trees, 25);
        // Unset fields keep defaults.
        assert_eq!(config.context_window, 10);
    }

    #[test]
    fn test_from_file_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("augur.ini");
        std::fs::write(&path, "whatever").unwrap();
        assert!(PredictorConfig::from_file(&path).is_err());
    }
}
