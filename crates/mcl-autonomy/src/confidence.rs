use serde::{Deserialize, Serialize};

/// Aggregate over decisions that received human feedback inside the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    /// Decisions carrying any feedback.
    pub total: u64,
    /// Decisions marked `correct`.
    pub correct: u64,
    /// Mean self-reported confidence over the same decisions.
    pub avg_confidence: f64,
}

impl FeedbackStats {
    pub fn accuracy(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

/// Blends ground-truth accuracy with historical self-reported confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceEstimator {
    pub window_days: i64,
    pub neutral: f64,
    pub accuracy_weight: f64,
    pub confidence_weight: f64,
}

impl Default for ConfidenceEstimator {
    fn default() -> Self {
        Self {
            window_days: 30,
            neutral: 0.5,
            accuracy_weight: 0.7,
            confidence_weight: 0.3,
        }
    }
}

impl ConfidenceEstimator {
    /// Score in `[0, 1]`; the neutral value when there is no feedback yet.
    pub fn score(&self, stats: &FeedbackStats) -> f64 {
        let Some(accuracy) = stats.accuracy() else {
            return self.neutral;
        };
        let blended =
            self.accuracy_weight * accuracy + self.confidence_weight * stats.avg_confidence;
        blended.clamp(0.0, 1.0)
    }
}
