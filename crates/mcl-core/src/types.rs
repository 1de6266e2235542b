use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::MclError;

/// Short unique identifier for a supervised agent (first 8 hex chars of a v4 UUID).
pub type AgentId = String;

/// Free-form identifier grouping a conversation's log entries.
pub type SessionId = String;

/// Monotonic row id of a recorded decision.
pub type DecisionId = i64;

/// Generate a fresh agent identifier.
pub fn new_agent_id() -> AgentId {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Generate a fresh session identifier.
pub fn new_session_id() -> SessionId {
    format!("session_{}", Uuid::new_v4().simple())
}

/// Implements `as_str`, `ALL`, `Display` and a validating `FromStr` for
/// enums persisted as lowercase strings.
macro_rules! string_enum {
    ($ty:ident, $field:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $s),+
                }
            }

            /// Accepted spellings, in declaration order.
            pub fn names() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = MclError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($ty::$variant),)+
                    other => Err(MclError::invalid_choice($field, other, &Self::names())),
                }
            }
        }
    };
}

/// Scheduling priority attached to an agent's task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

string_enum!(Priority, "priority", {
    Low => "low",
    Normal => "normal",
    High => "high",
});

/// Lifecycle status of an agent. Only `Active` agents are reported as running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Completed,
    Failed,
    Cancelled,
}

string_enum!(AgentStatus, "status", {
    Active => "active",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

/// The manager's verdict on an agent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approve,
    Deny,
    Escalate,
}

string_enum!(Verdict, "decision", {
    Approve => "approve",
    Deny => "deny",
    Escalate => "escalate",
});

/// Delayed human judgement on a recorded decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Correct,
    Incorrect,
}

string_enum!(Feedback, "feedback", {
    Correct => "correct",
    Incorrect => "incorrect",
});

/// Kind of entry written to the interaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    AgentRequest,
    ManagerResponse,
    AgentOutput,
    SystemEvent,
}

string_enum!(InteractionType, "interaction_type", {
    AgentRequest => "agent_request",
    ManagerResponse => "manager_response",
    AgentOutput => "agent_output",
    SystemEvent => "system_event",
});

/// Which way an interaction flowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    AgentToManager,
    ManagerToAgent,
    System,
}

string_enum!(Direction, "direction", {
    AgentToManager => "agent_to_manager",
    ManagerToAgent => "manager_to_agent",
    System => "system",
});

impl Direction {
    /// Glyph used by the text export.
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::AgentToManager => "🤖→🧠",
            Self::ManagerToAgent => "🧠→🤖",
            Self::System => "⚙️ ",
        }
    }
}

/// Output format for interaction log exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Text,
}

impl FromStr for ExportFormat {
    type Err = MclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(MclError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Text => "text",
        })
    }
}
