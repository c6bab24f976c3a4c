//! Traits shared across the storefront crates.

use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// A TOML-backed configuration that the generic `config` subcommands can
/// locate, load, initialize and export.
pub trait ConfigManager: Default + Serialize + DeserializeOwned {
    /// Project name, used for the config directory and env prefix.
    fn project_name() -> &'static str;

    /// Environment variable that points at an explicit config file.
    fn config_env_var() -> String {
        format!(
            "{}_CONFIG",
            Self::project_name().to_uppercase().replace(['-', ' '], "_")
        )
    }

    /// Platform default: `<config dir>/<project>/config.toml`.
    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(Self::project_name()).join("config.toml"))
    }

    /// Explicit path, then the env variable, then the platform default.
    fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(shellexpand::tilde(path).as_ref()));
        }
        if let Ok(path) = std::env::var(Self::config_env_var())
            && !path.trim().is_empty()
        {
            return Some(PathBuf::from(shellexpand::tilde(path.trim()).as_ref()));
        }
        Self::default_config_path()
    }

    /// Loads the configuration, falling back to defaults when no file exists.
    fn load(config_path: Option<&str>) -> Result<Self>;

    /// Serializes the configuration as pretty TOML.
    fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// The configuration as `(NAME, value)` environment pairs.
    fn to_env_vars(&self) -> Result<Vec<(String, String)>>;
}
