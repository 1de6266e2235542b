//! # mcl-core
//!
//! Core types and primitives for the mcl agent supervisor.
//! This crate defines the shared vocabulary used by every other crate in the workspace:
//! the unified error type and the enums persisted alongside agents, decisions and
//! interaction logs.

pub mod error;
pub mod types;

pub use error::{MclError, Result};
pub use types::*;
