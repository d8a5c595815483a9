//! Feature extraction from observation windows.
//!
//! Turns a short, time-ordered window of observations into a fixed-size
//! numeric vector describing the most recent entry in the context of its
//! predecessor, plus the training target category.

mod scaler;

pub use scaler::MinMaxScaler;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::error::{AugurError, AugurResult};
use crate::types::{Category, Observation};

/// Number of scalar features before the previous-category one-hot block.
const SCALAR_FEATURES: usize = 14;

/// Total feature vector length: 14 scalars plus a one-hot encoding of the
/// previous observation's category over the full category set.
pub const FEATURE_DIM: usize = SCALAR_FEATURES + Category::COUNT;

/// Extracts feature vectors from observation windows.
///
/// The "current" observation is the last element of the window; the
/// previous-entry features come from the second-to-last element. A window
/// of length one zero-fills the previous-entry scalars and leaves the
/// previous-category one-hot all-zero (no predecessor is distinct from a
/// predecessor whose action matched no keyword, which maps to `Other`).
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the feature vector and target category from a window.
    ///
    /// The window is re-sorted ascending by timestamp internally, so an
    /// already-sorted input passes through unchanged. Observations without
    /// a timestamp are treated as occurring at extraction time; this is a
    /// degraded-input fallback, and the temporal features then describe
    /// "now" rather than the true moment.
    ///
    /// Fails with [`AugurError::EmptyWindow`] when the window is empty.
    pub fn extract(&self, window: &[Observation]) -> AugurResult<(Vec<f64>, Category)> {
        if window.is_empty() {
            return Err(AugurError::empty_window("no observations provided"));
        }

        let now = Utc::now();
        let mut resolved: Vec<(DateTime<Utc>, &Observation)> = window
            .iter()
            .map(|obs| (obs.timestamp.unwrap_or(now), obs))
            .collect();
        resolved.sort_by_key(|(ts, _)| *ts);

        let (current_ts, current) = resolved[resolved.len() - 1];
        let previous = (resolved.len() > 1).then(|| resolved[resolved.len() - 2]);

        let hour = current_ts.hour() as f64;
        let day_of_week = current_ts.weekday().num_days_from_monday() as f64;
        let is_weekend = if day_of_week >= 5.0 { 1.0 } else { 0.0 };
        let is_morning = flag((6..12).contains(&current_ts.hour()));
        let is_afternoon = flag((12..18).contains(&current_ts.hour()));
        let is_evening = flag((18..22).contains(&current_ts.hour()));
        let is_night = flag(current_ts.hour() >= 22 || current_ts.hour() < 6);

        let duration = current.duration_minutes as f64;
        let is_short = flag(duration < 30.0);
        let is_medium = flag((30.0..120.0).contains(&duration));
        let is_long = flag(duration >= 120.0);

        let (prev_duration, prev_hour, time_gap_hours, prev_category) = match previous {
            Some((prev_ts, prev)) => {
                let gap = (current_ts - prev_ts).num_seconds() as f64 / 3600.0;
                (
                    prev.duration_minutes as f64,
                    prev_ts.hour() as f64,
                    gap,
                    Some(Category::categorize(&prev.action)),
                )
            }
            None => (0.0, 0.0, 0.0, None),
        };

        let mut features = Vec::with_capacity(FEATURE_DIM);
        features.extend_from_slice(&[
            hour,
            day_of_week,
            is_weekend,
            is_morning,
            is_afternoon,
            is_evening,
            is_night,
            duration,
            is_short,
            is_medium,
            is_long,
            prev_duration,
            prev_hour,
            time_gap_hours,
        ]);
        for category in Category::all() {
            features.push(flag(prev_category == Some(category)));
        }
        debug_assert_eq!(features.len(), FEATURE_DIM);

        Ok((features, Category::categorize(&current.action)))
    }

    /// Human-readable names for each feature dimension, in vector order.
    ///
    /// Used to label feature-importance scores.
    pub fn feature_names() -> Vec<String> {
        let mut names: Vec<String> = [
            "hour",
            "day_of_week",
            "is_weekend",
            "is_morning",
            "is_afternoon",
            "is_evening",
            "is_night",
            "duration_minutes",
            "is_short_activity",
            "is_medium_activity",
            "is_long_activity",
            "prev_duration",
            "prev_hour",
            "time_gap_hours",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        for name in Category::all_names() {
            names.push(format!("prev_is_{}", name.to_lowercase()));
        }
        names
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn obs(day: u32, hour: u32, action: &str, duration: u32) -> Observation {
        Observation::new(
            Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap(),
            action,
            duration,
        )
    }

    #[test]
    fn test_empty_window_is_error() {
        let err = FeatureExtractor::new().extract(&[]).unwrap_err();
        assert!(matches!(err, AugurError::EmptyWindow { .. }));
    }

    #[test]
    fn test_feature_dim_is_constant() {
        let (single, _) = FeatureExtractor::new().extract(&[obs(2, 9, "Work", 60)]).unwrap();
        let (pair, _) = FeatureExtractor::new()
            .extract(&[obs(2, 7, "Sleep", 480), obs(2, 9, "Work", 60)])
            .unwrap();
        assert_eq!(single.len(), FEATURE_DIM);
        assert_eq!(pair.len(), FEATURE_DIM);
        assert_eq!(FeatureExtractor::feature_names().len(), FEATURE_DIM);
    }

    #[test]
    fn test_temporal_features() {
        // 2025-06-02 is a Monday.
        let (features, target) = FeatureExtractor::new()
            .extract(&[obs(2, 9, "Homework", 45)])
            .unwrap();
        assert_eq!(features[0], 9.0); // hour
        assert_eq!(features[1], 0.0); // Monday
        assert_eq!(features[2], 0.0); // not weekend
        assert_eq!(features[3], 1.0); // morning
        assert_eq!(features[4], 0.0);
        assert_eq!(features[5], 0.0);
        assert_eq!(features[6], 0.0);
        assert_eq!(target, Category::Study);
    }

    #[test]
    fn test_weekend_and_night() {
        // 2025-06-07 is a Saturday.
        let (features, _) = FeatureExtractor::new()
            .extract(&[obs(7, 23, "Sleep", 480)])
            .unwrap();
        assert_eq!(features[1], 5.0);
        assert_eq!(features[2], 1.0);
        assert_eq!(features[6], 1.0); // night
    }

    #[test]
    fn test_duration_buckets() {
        let cases = [(10, (1.0, 0.0, 0.0)), (60, (0.0, 1.0, 0.0)), (180, (0.0, 0.0, 1.0))];
        for (duration, (short, medium, long)) in cases {
            let (features, _) = FeatureExtractor::new()
                .extract(&[obs(2, 9, "Work", duration)])
                .unwrap();
            assert_eq!((features[8], features[9], features[10]), (short, medium, long));
        }
    }

    #[test]
    fn test_previous_entry_features() {
        let (features, _) = FeatureExtractor::new()
            .extract(&[obs(2, 7, "Sleep", 480), obs(2, 9, "Work", 60)])
            .unwrap();
        assert_eq!(features[11], 480.0); // prev duration
        assert_eq!(features[12], 7.0); // prev hour
        assert_eq!(features[13], 2.0); // gap in hours

        let sleep_slot = SCALAR_FEATURES + Category::Sleep.index();
        assert_eq!(features[sleep_slot], 1.0);
        let one_hot_sum: f64 = features[SCALAR_FEATURES..].iter().sum();
        assert_eq!(one_hot_sum, 1.0);
    }

    #[test]
    fn test_single_entry_zero_fills_previous() {
        let (features, _) = FeatureExtractor::new().extract(&[obs(2, 9, "Work", 60)]).unwrap();
        assert_eq!(features[11], 0.0);
        assert_eq!(features[12], 0.0);
        assert_eq!(features[13], 0.0);
        let one_hot_sum: f64 = features[SCALAR_FEATURES..].iter().sum();
        assert_eq!(one_hot_sum, 0.0);
    }

    #[test]
    fn test_unsorted_window_is_sorted_internally() {
        let (sorted, _) = FeatureExtractor::new()
            .extract(&[obs(2, 7, "Sleep", 480), obs(2, 9, "Work", 60)])
            .unwrap();
        let (unsorted, _) = FeatureExtractor::new()
            .extract(&[obs(2, 9, "Work", 60), obs(2, 7, "Sleep", 480)])
            .unwrap();
        assert_eq!(sorted, unsorted);
    }

    #[test]
    fn test_unknown_previous_action_maps_to_other() {
        let (features, _) = FeatureExtractor::new()
            .extract(&[obs(2, 7, "zzzzz", 10), obs(2, 9, "Work", 60)])
            .unwrap();
        let other_slot = SCALAR_FEATURES + Category::Other.index();
        assert_eq!(features[other_slot], 1.0);
    }
}
