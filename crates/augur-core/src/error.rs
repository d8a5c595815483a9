//! Error types for augur operations.
//!
//! This module provides the error hierarchy for the prediction engine with
//! structured error codes for programmatic handling.

use thiserror::Error;

/// Result type alias for augur operations.
pub type AugurResult<T> = Result<T, AugurError>;

/// Main error type for all augur operations.
#[derive(Error, Debug)]
pub enum AugurError {
    /// Feature extraction was given an empty observation window.
    #[error("Empty observation window: {message}")]
    EmptyWindow { message: String },

    /// A prediction was requested before any data has been learned.
    #[error("Model not trained: {message}")]
    NotTrained { message: String },

    /// An observation could not be turned into features.
    ///
    /// Local to a single observation; bulk operations catch this, count
    /// the skip, and continue with the remaining batch.
    #[error("Unparseable observation: {reason}")]
    UnparseableObservation { reason: String },

    /// Saving or loading model state failed.
    #[error("Persistence error: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Remote API call failed (client side).
    #[error("API error: {message}")]
    Api { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Window / features (WIN_xxx)
    WinEmpty,
    WinUnparseable,

    // Model readiness (MODEL_xxx)
    ModelNotTrained,

    // Persistence (PERSIST_xxx)
    PersistSaveFailed,
    PersistLoadFailed,

    // Configuration (CFG_xxx)
    CfgInvalid,

    // Remote API (API_xxx)
    ApiRequestFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::WinEmpty => "WIN_001",
            ErrorCode::WinUnparseable => "WIN_002",
            ErrorCode::ModelNotTrained => "MODEL_001",
            ErrorCode::PersistSaveFailed => "PERSIST_001",
            ErrorCode::PersistLoadFailed => "PERSIST_002",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::ApiRequestFailed => "API_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl AugurError {
    /// Create an empty-window error.
    pub fn empty_window(message: impl Into<String>) -> Self {
        Self::EmptyWindow {
            message: message.into(),
        }
    }

    /// Create a not-trained error.
    pub fn not_trained() -> Self {
        Self::NotTrained {
            message: "no observations learned yet; call learn() before predict()".to_string(),
        }
    }

    /// Create an unparseable-observation error.
    pub fn unparseable(reason: impl Into<String>) -> Self {
        Self::UnparseableObservation {
            reason: reason.into(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// Create a persistence error wrapping an underlying cause.
    pub fn persistence_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyWindow { .. } => ErrorCode::WinEmpty,
            Self::UnparseableObservation { .. } => ErrorCode::WinUnparseable,
            Self::NotTrained { .. } => ErrorCode::ModelNotTrained,
            Self::Persistence { .. } => ErrorCode::PersistLoadFailed,
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            Self::Api { .. } => ErrorCode::ApiRequestFailed,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether the caller can retry after feeding the engine more data.
    ///
    /// True only for readiness errors; everything else indicates a bug or
    /// an environment problem.
    pub fn is_retryable_after_learning(&self) -> bool {
        matches!(self, Self::NotTrained { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_trained_error() {
        let err = AugurError::not_trained();
        assert_eq!(err.code(), ErrorCode::ModelNotTrained);
        assert!(err.is_retryable_after_learning());
        assert!(err.to_string().contains("not trained"));
    }

    #[test]
    fn test_empty_window_error() {
        let err = AugurError::empty_window("no observations provided");
        assert_eq!(err.code(), ErrorCode::WinEmpty);
        assert!(!err.is_retryable_after_learning());
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::WinEmpty.as_str(), "WIN_001");
        assert_eq!(ErrorCode::ModelNotTrained.as_str(), "MODEL_001");
    }
}
