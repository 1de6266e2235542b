//! # mcl-store
//!
//! SQLite persistence for the supervisor. One database holds five tables:
//!
//! - **agents**: registered agent sessions and their lifecycle status
//! - **decisions**: every approve/deny/escalate verdict, with later feedback
//! - **interaction_logs**: append-only conversation log grouped by session id
//! - **manager_config**: persisted posture and evaluation model
//! - **approval_queue**: escalated requests awaiting a human
//!
//! Writes that touch several tables run in a single transaction.

pub mod agents;
pub mod decisions;
pub mod interactions;
pub mod queue;
pub mod settings;
pub mod store;

pub use agents::{AgentRecord, NewAgent};
pub use decisions::{
    DecisionRecord, NewDecision, RecordOptions, RecordedDecision, synthesized_session_id,
};
pub use interactions::{
    AgentLogSummary, DEFAULT_SEARCH_LIMIT, InteractionEntry, LogQuery, NewInteraction,
    SessionSummary,
};
pub use queue::{ApprovalItem, ResolvedApproval, TOOL_REQUEST};
pub use settings::{AUTONOMY_LEVEL_KEY, EVALUATION_MODEL_KEY};
pub use store::{ManagerStore, StoreClock, format_timestamp};
