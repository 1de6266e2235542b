//! # mcl-cli
//!
//! Command-line interface for the mcl supervisor.
//!
//! ## Commands
//!
//! - `mcl spawn` registers an agent for a task
//! - `mcl status` lists agents
//! - `mcl evaluate` runs a tool request through the manager
//! - `mcl queue` / `mcl resolve` handle escalated requests
//! - `mcl config` shows or changes the autonomy level and model
//! - `mcl feedback` / `mcl history` close the learning loop
//! - `mcl logs` / `mcl sessions` / `mcl export` browse interaction logs
//! - `mcl simulate` replays sample requests

pub mod commands;
mod render;

pub use commands::Cli;
