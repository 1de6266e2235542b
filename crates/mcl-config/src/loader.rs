use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::schema::MclConfig;

/// Loads the mcl configuration from disk and the environment.
#[derive(Debug)]
pub struct ConfigLoader {
    config: MclConfig,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > MCL_CONFIG env > ~/.mcl/mcl.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("MCL_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mcl")
            .join("mcl.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> mcl_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            Self::parse(&raw, &config_path)?
        } else {
            if path.is_some() {
                warn!(?config_path, "config file not found, using defaults");
            }
            MclConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        for w in &config.validate()? {
            warn!("{}", w);
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Parse a TOML document into a config.
    pub fn parse(raw: &str, origin: &Path) -> mcl_core::Result<MclConfig> {
        toml::from_str::<MclConfig>(raw).map_err(|e| {
            mcl_core::MclError::Config(format!("failed to parse {}: {}", origin.display(), e))
        })
    }

    /// Get a snapshot of the loaded config.
    pub fn get(&self) -> MclConfig {
        self.config.clone()
    }

    /// Path the config was resolved from (it may not exist).
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (MCL_DATA_DIR, MCL_LOG_LEVEL, MCL_LOG_FORMAT).
    fn apply_env_overrides(mut config: MclConfig) -> MclConfig {
        if let Ok(v) = std::env::var("MCL_DATA_DIR") {
            if !v.is_empty() {
                config.manager.data_dir = PathBuf::from(v);
            }
        }
        if let Ok(v) = std::env::var("MCL_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("MCL_LOG_FORMAT") {
            config.logging.format = v;
        }
        config
    }
}
