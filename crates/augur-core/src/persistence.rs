//! Versioned model snapshots.
//!
//! The full model state (strategy parameters, scaler, memory buffer,
//! counters) serializes to a single self-describing JSON blob. The format
//! version and the embedded category universe let `load` reject
//! incompatible blobs outright instead of silently misbehaving on them.

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::Strategy;
use crate::error::{AugurError, AugurResult};
use crate::features::MinMaxScaler;
use crate::memory::MemoryBuffer;
use crate::types::Category;

/// Current snapshot format version. Bump on any incompatible change to
/// the snapshot layout or the feature vector semantics.
pub const FORMAT_VERSION: u32 = 1;

/// Everything needed to reconstruct an engine's learned state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub version: u32,
    /// Category universe at save time, in the fixed ordering. A model
    /// trained over one universe cannot be loaded into another.
    pub categories: Vec<String>,
    pub strategy: Strategy,
    pub scaler: MinMaxScaler,
    pub memory: MemoryBuffer,
    pub total_entries_learned: u64,
    pub predictions_made: u64,
    pub saved_at: DateTime<Utc>,
}

impl ModelSnapshot {
    /// Validate format version and category universe.
    fn validate(&self) -> AugurResult<()> {
        if self.version != FORMAT_VERSION {
            return Err(AugurError::persistence(format!(
                "unsupported snapshot version {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        let current: Vec<String> = Category::all_names()
            .into_iter()
            .map(String::from)
            .collect();
        if self.categories != current {
            return Err(AugurError::persistence(
                "snapshot category universe does not match this build".to_string(),
            ));
        }
        Ok(())
    }
}

/// Write a snapshot to `path`.
///
/// The blob is written to a sibling temp file first and renamed into
/// place, so a crash mid-write never leaves a truncated snapshot behind.
/// Failure is reported to the caller and leaves any previous snapshot on
/// disk untouched.
pub fn save_snapshot(snapshot: &ModelSnapshot, path: &Path) -> AugurResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                AugurError::persistence_with_source(
                    format!("failed to create model directory {}", parent.display()),
                    e,
                )
            })?;
        }
    }

    let tmp_path = path.with_extension("tmp");
    let file = fs::File::create(&tmp_path).map_err(|e| {
        AugurError::persistence_with_source(
            format!("failed to create {}", tmp_path.display()),
            e,
        )
    })?;
    serde_json::to_writer(BufWriter::new(file), snapshot).map_err(|e| {
        AugurError::persistence_with_source("failed to serialize model snapshot", e)
    })?;
    fs::rename(&tmp_path, path).map_err(|e| {
        AugurError::persistence_with_source(
            format!("failed to move snapshot into place at {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

/// Read a snapshot from `path`.
///
/// Returns `Ok(None)` when no file exists; starting empty is the normal
/// first-run condition, not an error. A file that exists but cannot be
/// parsed or validated is an error; callers decide whether that degrades
/// to empty state (engine construction) or propagates (explicit load).
pub fn load_snapshot(path: &Path) -> AugurResult<Option<ModelSnapshot>> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(AugurError::persistence_with_source(
                format!("failed to open {}", path.display()),
                e,
            ))
        }
    };

    let snapshot: ModelSnapshot =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            AugurError::persistence_with_source(
                format!("failed to parse snapshot at {}", path.display()),
                e,
            )
        })?;
    snapshot.validate()?;
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ForestParams, StrategyKind};

    fn snapshot() -> ModelSnapshot {
        ModelSnapshot {
            version: FORMAT_VERSION,
            categories: Category::all_names().into_iter().map(String::from).collect(),
            strategy: Strategy::new(StrategyKind::Online, ForestParams::default()),
            scaler: MinMaxScaler::new(),
            memory: MemoryBuffer::new(10),
            total_entries_learned: 3,
            predictions_made: 1,
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        save_snapshot(&snapshot(), &path).unwrap();
        let loaded = load_snapshot(&path).unwrap().unwrap();
        assert_eq!(loaded.total_entries_learned, 3);
        assert_eq!(loaded.predictions_made, 1);
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(load_snapshot(&path).unwrap().is_none());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut old = snapshot();
        old.version = 999;
        save_snapshot(&old, &path).unwrap();

        let err = load_snapshot(&path).unwrap_err();
        assert!(matches!(err, AugurError::Persistence { .. }));
    }

    #[test]
    fn test_corrupt_blob_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "not json at all").unwrap();
        assert!(load_snapshot(&path).is_err());
    }

    #[test]
    fn test_category_universe_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut foreign = snapshot();
        foreign.categories = vec!["Alpha".to_string(), "Beta".to_string()];
        save_snapshot(&foreign, &path).unwrap();
        assert!(load_snapshot(&path).is_err());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("model.json");
        save_snapshot(&snapshot(), &path).unwrap();
        assert!(path.exists());
    }
}
