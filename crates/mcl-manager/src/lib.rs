//! # mcl-manager
//!
//! The facade callers talk to. A [`Manager`] owns the store, the task-note
//! sink and the escalation policy, and turns an agent request into a
//! recorded, explained decision:
//!
//! request → risk score → confidence from feedback → posture rules → decision
//! row + request/response log entries (+ approval queue item when escalated).

pub mod export;
pub mod manager;
pub mod notes;
pub mod simulate;

pub use manager::{Evaluation, Manager, ManagerSettings};
pub use notes::{FsTaskNotes, TaskNote, TaskNotes, render_task_note};
pub use simulate::{sample_requests, simulation_session_id};
