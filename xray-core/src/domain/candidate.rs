//! Candidate filtering events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::Metadata;

/// One filtering/selection operation that reduced a candidate set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub step_name: String,
    pub input_count: i64,
    pub output_count: i64,
    pub filters_applied: Vec<String>,
    /// Rejection reason -> count or label
    pub sample_rejections: Metadata,
    pub sample_accepted: Vec<Value>,
    pub sample_rejected: Vec<Value>,
    pub timestamp: DateTime<Utc>,
    pub metadata: Metadata,
}

impl Candidate {
    /// Percentage of candidates removed by this event.
    ///
    /// Always derived from the two counts, never stored.
    pub fn elimination_rate(&self) -> f64 {
        elimination_rate(self.input_count, self.output_count)
    }
}

/// `(input - output) * 100 / input`, or `0` when there was no input.
///
/// `output_count > input_count` is accepted and yields a negative rate, so
/// callers must not assume the result lies within `0..=100`.
pub fn elimination_rate(input_count: i64, output_count: i64) -> f64 {
    if input_count <= 0 {
        return 0.0;
    }
    (input_count - output_count) as f64 * 100.0 / input_count as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elimination_rate_exact() {
        assert_eq!(elimination_rate(1000, 5), 99.5);
        assert_eq!(elimination_rate(100, 60), 40.0);
        assert_eq!(elimination_rate(100, 100), 0.0);
        assert_eq!(elimination_rate(100, 0), 100.0);
    }

    #[test]
    fn test_elimination_rate_zero_input() {
        assert_eq!(elimination_rate(0, 0), 0.0);
        assert_eq!(elimination_rate(0, 10), 0.0);
    }

    #[test]
    fn test_elimination_rate_can_be_negative() {
        // More output than input is not rejected; the rate goes below zero.
        assert_eq!(elimination_rate(10, 15), -50.0);
    }

    #[test]
    fn test_candidate_rate_tracks_counts() {
        let mut candidate = Candidate {
            id: Uuid::new_v4(),
            step_name: "filter".to_string(),
            input_count: 200,
            output_count: 50,
            filters_applied: vec!["price".to_string()],
            sample_rejections: Metadata::new(),
            sample_accepted: vec![],
            sample_rejected: vec![],
            timestamp: Utc::now(),
            metadata: Metadata::new(),
        };
        assert_eq!(candidate.elimination_rate(), 75.0);

        candidate.output_count = 200;
        assert_eq!(candidate.elimination_rate(), 0.0);
    }
}
