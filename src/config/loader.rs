use super::RefineConfig;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = ".iris-refine";
const CONFIG_FILE: &str = "config.toml";

impl RefineConfig {
    /// `~/.iris-refine/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from `path` (or the default location), falling back to built-in
    /// defaults when the file does not exist. Env overrides are applied last.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)
                .with_context(|| format!("Failed to load {}", config_path.display()))?
        } else {
            if path.is_some() {
                anyhow::bail!("Config file {} does not exist", config_path.display());
            }
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Self {
                config_path,
                ..Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// External catalog path with `~` expanded, if configured.
    pub fn catalog_path(&self) -> Option<PathBuf> {
        let raw = self.policy.catalog_path.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        Some(PathBuf::from(shellexpand::tilde(raw).into_owned()))
    }
}
