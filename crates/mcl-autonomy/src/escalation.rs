use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::level::{AutonomyLevel, Thresholds};
use crate::risk::{self, RiskAssessment};

/// Source of the uniform `[0, 1)` draws used by the exploration rule.
///
/// Injected so tests (and replays) can make escalation deterministic.
pub trait ExplorationSource: Send {
    fn draw(&mut self) -> f64;
}

impl<F> ExplorationSource for F
where
    F: FnMut() -> f64 + Send,
{
    fn draw(&mut self) -> f64 {
        self()
    }
}

/// Draws from the thread-local generator on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomExploration;

impl ExplorationSource for RandomExploration {
    fn draw(&mut self) -> f64 {
        rand::random::<f64>()
    }
}

/// Everything a rule may look at when judging one request.
#[derive(Debug, Clone, Copy)]
pub struct EscalationContext<'a> {
    pub request: &'a serde_json::Value,
    pub risk: RiskAssessment,
    pub confidence: f64,
    pub level: AutonomyLevel,
    pub thresholds: Thresholds,
}

/// What a single rule concluded.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleVerdict {
    /// No objection; later rules still run.
    Pass,
    /// Route to a human with a reason.
    Escalate(String),
}

/// A single escalation rule. Rules run in registration order; the first to
/// escalate decides.
pub trait EscalationRule: Send + Sync {
    fn name(&self) -> &str;
    fn evaluate(&self, ctx: &EscalationContext<'_>) -> RuleVerdict;
}

/// Explained result of running the policy.
#[derive(Debug, Clone, Serialize)]
pub struct EscalationOutcome {
    pub escalate: bool,
    /// Name of the rule that escalated, if any.
    pub rule: Option<String>,
    pub reason: String,
    pub risk: RiskAssessment,
    pub confidence: f64,
    pub level: AutonomyLevel,
}

/// Combines risk, confidence and the autonomy posture into an escalate decision.
pub struct EscalationPolicy {
    rules: Vec<Box<dyn EscalationRule>>,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new(Box::new(RandomExploration))
    }
}

impl EscalationPolicy {
    /// Build the standard rule chain: risk ceiling, confidence floor, exploration.
    pub fn new(exploration: Box<dyn ExplorationSource>) -> Self {
        let mut policy = Self { rules: Vec::new() };
        policy.add_rule(Box::new(RiskCeilingRule));
        policy.add_rule(Box::new(ConfidenceFloorRule));
        policy.add_rule(Box::new(ExplorationRule {
            source: Mutex::new(exploration),
        }));
        policy
    }

    pub fn add_rule(&mut self, rule: Box<dyn EscalationRule>) {
        self.rules.push(rule);
    }

    /// Run every rule against a request and explain the result.
    pub fn evaluate(
        &self,
        request: &serde_json::Value,
        confidence: f64,
        level: AutonomyLevel,
    ) -> EscalationOutcome {
        let ctx = EscalationContext {
            request,
            risk: risk::assess(request),
            confidence: confidence.clamp(0.0, 1.0),
            level,
            thresholds: level.thresholds(),
        };

        for rule in &self.rules {
            if let RuleVerdict::Escalate(reason) = rule.evaluate(&ctx) {
                debug!(
                    rule = rule.name(),
                    risk = ctx.risk.score,
                    confidence = ctx.confidence,
                    posture = %level,
                    "request escalated"
                );
                return EscalationOutcome {
                    escalate: true,
                    rule: Some(rule.name().to_string()),
                    reason,
                    risk: ctx.risk,
                    confidence: ctx.confidence,
                    level,
                };
            }
        }

        EscalationOutcome {
            escalate: false,
            rule: None,
            reason: format!(
                "{} within {} limits at confidence {:.2}",
                ctx.risk.describe(),
                level,
                ctx.confidence
            ),
            risk: ctx.risk,
            confidence: ctx.confidence,
            level,
        }
    }

    pub fn should_escalate(
        &self,
        request: &serde_json::Value,
        confidence: f64,
        level: AutonomyLevel,
    ) -> bool {
        self.evaluate(request, confidence, level).escalate
    }
}

// ── Built-in rules ─────────────────────────────────────────────

/// Risk above the posture's ceiling always escalates.
struct RiskCeilingRule;

impl EscalationRule for RiskCeilingRule {
    fn name(&self) -> &str {
        "risk_ceiling"
    }

    fn evaluate(&self, ctx: &EscalationContext<'_>) -> RuleVerdict {
        if ctx.risk.score > ctx.thresholds.risk {
            RuleVerdict::Escalate(format!(
                "{} exceeds the {} threshold {:.2}",
                ctx.risk.describe(),
                ctx.level,
                ctx.thresholds.risk
            ))
        } else {
            RuleVerdict::Pass
        }
    }
}

/// Confidence below the posture's floor always escalates.
struct ConfidenceFloorRule;

impl EscalationRule for ConfidenceFloorRule {
    fn name(&self) -> &str {
        "confidence_floor"
    }

    fn evaluate(&self, ctx: &EscalationContext<'_>) -> RuleVerdict {
        if ctx.confidence < ctx.thresholds.confidence {
            RuleVerdict::Escalate(format!(
                "confidence {:.2} is below the {} threshold {:.2}",
                ctx.confidence, ctx.level, ctx.thresholds.confidence
            ))
        } else {
            RuleVerdict::Pass
        }
    }
}

/// Occasionally escalates otherwise-approved requests so human feedback keeps
/// arriving. The chance shrinks as confidence grows. One fresh draw per call.
struct ExplorationRule {
    source: Mutex<Box<dyn ExplorationSource>>,
}

impl EscalationRule for ExplorationRule {
    fn name(&self) -> &str {
        "exploration"
    }

    fn evaluate(&self, ctx: &EscalationContext<'_>) -> RuleVerdict {
        let chance = ctx.thresholds.escalate_percentage * (1.0 - ctx.confidence);
        let draw = self.source.lock().draw();
        if draw < chance {
            RuleVerdict::Escalate(format!(
                "sampled for human review ({:.0}% chance under {})",
                chance * 100.0,
                ctx.level
            ))
        } else {
            RuleVerdict::Pass
        }
    }
}
