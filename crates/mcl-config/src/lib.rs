//! # mcl-config
//!
//! Configuration system for the mcl supervisor. Reads from `mcl.toml` and
//! environment variables, with CLI overrides applied by the caller.
//!
//! The autonomy posture and evaluation model are not file settings; they are
//! persisted by the manager itself and changed through `mcl config`.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::MclConfig;
pub use schema::{ConfigWarning, LoggingConfig, ManagerConfig, WarningSeverity};
