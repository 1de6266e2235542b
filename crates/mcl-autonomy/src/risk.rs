use serde::Serialize;

/// A named family of risky operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Destructive,
    System,
    Network,
    Database,
    Config,
    External,
    Files,
    Install,
    Read,
    Test,
}

impl RiskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Destructive => "destructive",
            Self::System => "system",
            Self::Network => "network",
            Self::Database => "database",
            Self::Config => "config",
            Self::External => "external",
            Self::Files => "files",
            Self::Install => "install",
            Self::Read => "read",
            Self::Test => "test",
        }
    }
}

// Keywords are lowercase; they are matched against the lowercased request.
const RISK_TABLE: &[(RiskCategory, f64, &[&str])] = &[
    (
        RiskCategory::Destructive,
        1.0,
        &["rm -rf", "delete", "drop table", "truncate", "format"],
    ),
    (
        RiskCategory::System,
        0.95,
        &["sudo", "chmod 777", "chown", "passwd"],
    ),
    (
        RiskCategory::Network,
        0.9,
        &["curl -x delete", "wget", "ssh", "scp"],
    ),
    (
        RiskCategory::Database,
        0.7,
        &["alter table", "create table", "migration", "schema"],
    ),
    (
        RiskCategory::Config,
        0.6,
        &["config", "settings", ".env", "credentials"],
    ),
    (RiskCategory::External, 0.6, &["http", "api", "webhook"]),
    (RiskCategory::Files, 0.4, &["write", "edit", "move", "copy"]),
    (
        RiskCategory::Install,
        0.3,
        &["npm install", "pip install", "apt install"],
    ),
    (
        RiskCategory::Read,
        0.1,
        &["read", "cat", "ls", "grep", "search"],
    ),
    (RiskCategory::Test, 0.1, &["test", "pytest", "jest", "spec"]),
];

/// Result of scoring a request: the score and the category that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub score: f64,
    /// `None` when no keyword matched.
    pub category: Option<RiskCategory>,
}

impl RiskAssessment {
    pub fn describe(&self) -> String {
        match self.category {
            Some(c) => format!("{} risk {:.2}", c.as_str(), self.score),
            None => format!("no known risk pattern ({:.2})", self.score),
        }
    }
}

/// Score a request and report which category won.
///
/// The request is serialized to JSON (object keys are sorted, so identical
/// inputs always produce identical text), lowercased, and scanned for each
/// category's keywords. The highest matching weight wins; matches are never summed.
pub fn assess(request: &serde_json::Value) -> RiskAssessment {
    let blob = serialize_lowercase(request);

    let mut best = RiskAssessment {
        score: 0.0,
        category: None,
    };
    for (category, weight, keywords) in RISK_TABLE {
        if *weight > best.score && keywords.iter().any(|k| blob.contains(k)) {
            best = RiskAssessment {
                score: *weight,
                category: Some(*category),
            };
        }
    }
    best.score = best.score.clamp(0.0, 1.0);
    best
}

/// Risk score in `[0, 1]` for a proposed operation.
pub fn assess_risk(request: &serde_json::Value) -> f64 {
    assess(request).score
}

fn serialize_lowercase(request: &serde_json::Value) -> String {
    // Bare strings are scanned as-is rather than with their JSON quotes.
    match request {
        serde_json::Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    }
}
