use thiserror::Error;

/// Unified error type for the mcl supervisor.
#[derive(Error, Debug)]
pub enum MclError {
    // ── Input errors ───────────────────────────────────────────
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Unsupported format: {0} (expected one of: json, text)")]
    UnsupportedFormat(String),

    // ── Lookup errors ──────────────────────────────────────────
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    // ── Persistence errors ─────────────────────────────────────
    #[error("store error: {0}")]
    Store(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MclError {
    /// Build a validation error whose reason lists the accepted values.
    pub fn invalid_choice(field: &str, got: &str, allowed: &[&str]) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: format!(
                "{} must be one of: {} (got '{}')",
                field.replace('_', " "),
                allowed.join(", "),
                got
            ),
        }
    }

    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// True for errors caused by caller input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_) | Self::Validation { .. } | Self::UnsupportedFormat(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MclError>;
