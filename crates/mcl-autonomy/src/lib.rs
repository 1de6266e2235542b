//! # mcl-autonomy
//!
//! The decision logic of the supervisor. Scores the risk of a proposed agent
//! operation, blends historical feedback into a confidence estimate, and applies
//! one of three autonomy postures to decide whether a request is approved or
//! escalated to a human.
//!
//! Everything here is pure or depends only on values passed in; persistence lives
//! in `mcl-store`.

pub mod confidence;
pub mod escalation;
pub mod level;
pub mod risk;

pub use confidence::{ConfidenceEstimator, FeedbackStats};
pub use escalation::{
    EscalationContext, EscalationOutcome, EscalationPolicy, EscalationRule, ExplorationSource,
    RandomExploration, RuleVerdict,
};
pub use level::{AutonomyLevel, EvaluationModel, Thresholds};
pub use risk::{RiskAssessment, RiskCategory, assess, assess_risk};
