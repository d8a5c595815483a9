//! Min-max feature scaling.

use serde::{Deserialize, Serialize};

use crate::error::{AugurError, AugurResult};

/// Min-max scaler mapping each feature dimension into [0, 1] relative to
/// the data it was fitted on.
///
/// Fitting is a one-time event for the life of a model: the engine fits the
/// scaler on the very first features seen and reuses the parameters for
/// every later transform. Refitting after the classifier has started
/// learning would silently change what each dimension means, so only
/// `reset` (via a fresh scaler) can clear the parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinMaxScaler {
    data_min: Vec<f64>,
    /// Per-dimension data range. A dimension with zero observed range is
    /// stored as 1.0 so transforms stay finite.
    data_range: Vec<f64>,
    fitted: bool,
}

impl MinMaxScaler {
    /// Create an unfitted scaler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the scaler has been fitted.
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Fit the per-dimension minimum and range from the given rows.
    ///
    /// Idempotence is enforced by the caller (the engine gates fitting on
    /// "no data learned yet"); calling `fit` again simply refits.
    pub fn fit(&mut self, rows: &[Vec<f64>]) -> AugurResult<()> {
        let first = rows
            .first()
            .ok_or_else(|| AugurError::Internal("cannot fit scaler on zero rows".to_string()))?;
        let dim = first.len();

        let mut min = vec![f64::INFINITY; dim];
        let mut max = vec![f64::NEG_INFINITY; dim];
        for row in rows {
            if row.len() != dim {
                return Err(AugurError::Internal(format!(
                    "inconsistent feature dimension: expected {}, got {}",
                    dim,
                    row.len()
                )));
            }
            for (d, value) in row.iter().enumerate() {
                min[d] = min[d].min(*value);
                max[d] = max[d].max(*value);
            }
        }

        self.data_range = min
            .iter()
            .zip(&max)
            .map(|(lo, hi)| {
                let range = hi - lo;
                if range.abs() < f64::EPSILON {
                    1.0
                } else {
                    range
                }
            })
            .collect();
        self.data_min = min;
        self.fitted = true;
        Ok(())
    }

    /// Scale one feature vector with the fitted parameters.
    ///
    /// Values outside the fitted range map outside [0, 1]; callers needing
    /// non-negative inputs (the naive Bayes classifier) take the absolute
    /// value of the result.
    pub fn transform(&self, features: &[f64]) -> AugurResult<Vec<f64>> {
        if !self.fitted {
            return Err(AugurError::Internal(
                "scaler used before being fitted".to_string(),
            ));
        }
        if features.len() != self.data_min.len() {
            return Err(AugurError::Internal(format!(
                "feature dimension {} does not match fitted dimension {}",
                features.len(),
                self.data_min.len()
            )));
        }
        Ok(features
            .iter()
            .enumerate()
            .map(|(d, value)| (value - self.data_min[d]) / self.data_range[d])
            .collect())
    }
}
