//! Observation records fed into the prediction engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One real-world activity entry.
///
/// Created by an external caller (diary capture, API request) and never
/// mutated by the engine. A missing timestamp is tolerated as degraded
/// input: feature extraction substitutes the extraction time, so temporal
/// features then reflect "now" rather than the true moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// When the activity occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Free-text label of the activity (e.g. "Sleep", "Homework").
    pub action: String,
    /// Optional free-text description. The engine ignores its content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Duration in minutes; 0 if unknown. Accepts JSON `null` as 0.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub duration_minutes: u32,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(0))
}

impl Observation {
    /// Create an observation with an explicit timestamp.
    pub fn new(
        timestamp: DateTime<Utc>,
        action: impl Into<String>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            timestamp: Some(timestamp),
            action: action.into(),
            description: None,
            duration_minutes,
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Sort observations ascending by timestamp.
///
/// Entries without a timestamp sort before any timestamped entry and keep
/// their relative input order, so bulk learning stays deterministic.
pub fn sort_chronologically(observations: &mut [Observation]) {
    observations.sort_by_key(|o| o.timestamp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_sort_chronologically() {
        let mut observations = vec![
            Observation::new(at(12), "Work", 60),
            Observation::new(at(7), "Sleep", 480),
            Observation::new(at(9), "Workout", 45),
        ];
        sort_chronologically(&mut observations);
        let actions: Vec<&str> = observations.iter().map(|o| o.action.as_str()).collect();
        assert_eq!(actions, vec!["Sleep", "Workout", "Work"]);
    }

    #[test]
    fn test_missing_timestamps_sort_first() {
        let mut observations = vec![
            Observation::new(at(12), "Work", 60),
            Observation {
                timestamp: None,
                action: "Duties".to_string(),
                description: None,
                duration_minutes: 15,
            },
        ];
        sort_chronologically(&mut observations);
        assert_eq!(observations[0].action, "Duties");
    }

    #[test]
    fn test_observation_deserializes_with_defaults() {
        let obs: Observation =
            serde_json::from_str(r#"{"action": "Sleep"}"#).unwrap();
        assert_eq!(obs.action, "Sleep");
        assert_eq!(obs.duration_minutes, 0);
        assert!(obs.timestamp.is_none());
        assert!(obs.description.is_none());
    }

    #[test]
    fn test_null_duration_reads_as_zero() {
        let obs: Observation =
            serde_json::from_str(r#"{"action": "Sleep", "duration_minutes": null}"#).unwrap();
        assert_eq!(obs.duration_minutes, 0);
    }
}
