use mcl_core::MclError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Three autonomy postures controlling how eagerly requests are escalated:
///
/// - **Conservative**: escalates anything beyond trivial risk and keeps sampling
///   approved requests for human review.
/// - **Balanced**: the default; moderate thresholds on both risk and confidence.
/// - **Aggressive**: only clearly dangerous or low-confidence requests escalate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutonomyLevel {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

/// Fixed per-posture limits used by the escalation policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Confidence below this always escalates.
    pub confidence: f64,
    /// Risk above this always escalates.
    pub risk: f64,
    /// Scale of the random exploration escalation.
    pub escalate_percentage: f64,
}

impl AutonomyLevel {
    pub const ALL: [AutonomyLevel; 3] = [Self::Conservative, Self::Balanced, Self::Aggressive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        match self {
            Self::Conservative => Thresholds {
                confidence: 0.8,
                risk: 0.3,
                escalate_percentage: 0.7,
            },
            Self::Balanced => Thresholds {
                confidence: 0.6,
                risk: 0.5,
                escalate_percentage: 0.4,
            },
            Self::Aggressive => Thresholds {
                confidence: 0.4,
                risk: 0.7,
                escalate_percentage: 0.2,
            },
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Conservative => "Escalates most requests; frequent human review",
            Self::Balanced => "Auto-approves routine work, escalates risky or uncertain requests",
            Self::Aggressive => "Escalates only high-risk or low-confidence requests",
        }
    }
}

impl fmt::Display for AutonomyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutonomyLevel {
    type Err = MclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|l| l.as_str()).collect();
                MclError::invalid_choice("autonomy_level", s, &names)
            })
    }
}

/// Label of the model the manager reports as its evaluator. Stored, never called.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EvaluationModel(String);

impl EvaluationModel {
    pub const ALLOWED: [&'static str; 8] = [
        "gpt-4o",
        "gpt-4-turbo",
        "gpt-4",
        "claude-3.5-sonnet",
        "claude-3-opus",
        "claude-3-sonnet",
        "o1-preview",
        "o1-mini",
    ];

    pub const DEFAULT: &'static str = "claude-3.5-sonnet";

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EvaluationModel {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for EvaluationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EvaluationModel {
    type Err = MclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::ALLOWED.contains(&s) {
            Ok(Self(s.to_string()))
        } else {
            Err(MclError::invalid_choice("evaluation_model", s, &Self::ALLOWED))
        }
    }
}

impl TryFrom<String> for EvaluationModel {
    type Error = MclError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EvaluationModel> for String {
    fn from(model: EvaluationModel) -> Self {
        model.0
    }
}
