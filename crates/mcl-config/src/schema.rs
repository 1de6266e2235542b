use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration, maps to `mcl.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MclConfig {
    pub manager: ManagerConfig,
    pub logging: LoggingConfig,
}

// ── Manager ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Directory holding `manager.db` and the per-agent task notes.
    pub data_dir: PathBuf,
    /// Budget assigned to agents spawned without an explicit one.
    pub default_budget: i64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_budget: 100,
        }
    }
}

impl ManagerConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("manager.db")
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.data_dir.join("agents")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mcl")
        .join("manager")
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let icon = match self.severity {
            WarningSeverity::Error => "❌",
            WarningSeverity::Warning => "⚠️ ",
        };
        write!(f, "{} {}: {}", icon, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, "\n   ↳ {}", h)?;
        }
        Ok(())
    }
}

impl MclConfig {
    /// Validate the config and return a list of warnings.
    /// Returns `ConfigValidation` naming every field with an Error severity.
    pub fn validate(&self) -> mcl_core::Result<Vec<ConfigWarning>> {
        let mut warnings = Vec::new();

        // ── Data directory ───
        if self.manager.data_dir.as_os_str().is_empty() {
            warnings.push(ConfigWarning {
                field: "manager.data_dir".into(),
                message: "data directory is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. '~/.mcl/manager'".into()),
            });
        } else if self.manager.data_dir.is_relative() {
            warnings.push(ConfigWarning {
                field: "manager.data_dir".into(),
                message: format!(
                    "'{}' is relative; resolved against the working directory",
                    self.manager.data_dir.display()
                ),
                severity: WarningSeverity::Warning,
                hint: Some("Use an absolute path so every shell sees the same agents".into()),
            });
        }

        // ── Budget ───
        if self.manager.default_budget < 0 {
            warnings.push(ConfigWarning {
                field: "manager.default_budget".into(),
                message: format!("budget {} is negative", self.manager.default_budget),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 100".into()),
            });
        } else if self.manager.default_budget == 0 {
            warnings.push(ConfigWarning {
                field: "manager.default_budget".into(),
                message: "budget is zero; agents start with nothing to spend".into(),
                severity: WarningSeverity::Warning,
                hint: None,
            });
        }

        // ── Logging format ───
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        // ── Logging level ───
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        let errors: Vec<&ConfigWarning> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .collect();

        if !errors.is_empty() {
            return Err(mcl_core::MclError::ConfigValidation {
                field: errors
                    .iter()
                    .map(|w| w.field.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                reason: errors
                    .iter()
                    .map(|w| w.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            });
        }

        Ok(warnings)
    }
}
