//! Handlers for the `config` subcommands.
//!
//! The `cmd_config_*` functions are generic over [`ConfigManager`]; the
//! dotted-key helpers work on any TOML tree.

use std::io::Write;
use std::path::{Path, PathBuf};

use storefront_core::StorefrontConfig;
use storefront_core::traits::ConfigManager;

use crate::cli::ConfigAction;
use crate::error::Result;

type CoreError = storefront_core::Error;

/// Runs a config subcommand against [`StorefrontConfig`].
pub fn handle_config_command(
    config_path: Option<&str>,
    action: ConfigAction,
    out: &mut dyn Write,
) -> Result<()> {
    match action {
        ConfigAction::Path => cmd_config_path::<StorefrontConfig>(config_path, out),
        ConfigAction::Get { key } => cmd_config_get::<StorefrontConfig>(config_path, &key, out),
        ConfigAction::Set { key, value } => {
            cmd_config_set::<StorefrontConfig>(config_path, &key, &value, out)
        }
        ConfigAction::Init { file, force } => {
            cmd_config_init::<StorefrontConfig>(file.as_deref(), force, out)
        }
        ConfigAction::Export { docker_env } => {
            let config = StorefrontConfig::load(config_path)?;
            cmd_config_export(&config, docker_env, out)
        }
    }
}

/// Prints the resolved config file path.
pub fn cmd_config_path<C: ConfigManager>(config_path: Option<&str>, out: &mut dyn Write) -> Result<()> {
    let path = C::resolve_config_path(config_path)
        .ok_or_else(|| CoreError::config("Could not determine config directory for this platform"))?;
    writeln!(out, "{}", path.display())?;
    if !path.exists() {
        tracing::info!(
            "{} does not exist yet; `{} config init` creates it",
            path.display(),
            C::project_name()
        );
    }
    Ok(())
}

/// Prints a configuration value by dotted key.
pub fn cmd_config_get<C: ConfigManager>(config_path: Option<&str>, key: &str, out: &mut dyn Write) -> Result<()> {
    let config = C::load(config_path)?;
    let tree = toml::Value::try_from(&config).map_err(|e| CoreError::config(e.to_string()))?;
    let value = get_nested_value(&tree, key)
        .ok_or_else(|| CoreError::config(format!("Key '{key}' not found in configuration")))?;
    writeln!(out, "{}", format_toml_value(value))?;
    Ok(())
}

/// Sets a value by dotted key in the config file.
///
/// The edited file must still load as `C`; otherwise nothing is written.
pub fn cmd_config_set<C: ConfigManager>(
    config_path: Option<&str>,
    key: &str,
    value: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let path = C::resolve_config_path(config_path)
        .ok_or_else(|| CoreError::config("Could not determine config directory"))?;
    if !path.exists() {
        return Err(CoreError::config(format!(
            "Config file does not exist at {}. Run `{} config init` first.",
            path.display(),
            C::project_name()
        ))
        .into());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| CoreError::io_with_path(e, &path))?;
    let mut doc: toml::Value = toml::from_str(&content)
        .map_err(|e| CoreError::config(format!("Failed to parse {}: {e}", path.display())))?;
    set_nested_value(&mut doc, key, parse_value(value))?;

    let edited = toml::to_string_pretty(&doc).map_err(|e| CoreError::config(e.to_string()))?;
    toml::from_str::<C>(&edited).map_err(|e| CoreError::config(format!("Invalid value for '{key}': {e}")))?;
    write_file(&path, &edited)?;

    writeln!(out, "Set {key} = {value} in {}", path.display())?;
    Ok(())
}

/// Writes a default configuration file.
pub fn cmd_config_init<C: ConfigManager>(file: Option<&str>, force: bool, out: &mut dyn Write) -> Result<()> {
    let path = match file {
        Some(p) => PathBuf::from(p),
        None => C::default_config_path().ok_or_else(|| CoreError::config("Could not determine config directory"))?,
    };
    if path.exists() && !force {
        return Err(CoreError::config(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        ))
        .into());
    }

    write_file(&path, &C::default().to_toml_string()?)?;
    writeln!(out, "Config file created at {}", path.display())?;
    Ok(())
}

/// Prints the configuration as `NAME=value` lines.
pub fn cmd_config_export<C: ConfigManager>(config: &C, docker_env: bool, out: &mut dyn Write) -> Result<()> {
    for (key, value) in config.to_env_vars()? {
        if docker_env {
            writeln!(out, "--env {key}={value}")?;
        } else {
            writeln!(out, "{key}={value}")?;
        }
    }
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CoreError::io_with_path(e, parent))?;
    }
    std::fs::write(path, content).map_err(|e| CoreError::io_with_path(e, path))?;
    Ok(())
}

// ============================================================================
// TOML dotted-key helpers
// ============================================================================

/// Looks up a dotted key path in a TOML tree.
pub fn get_nested_value<'a>(value: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.')
        .try_fold(value, |current, part| current.as_table()?.get(part))
}

/// Sets a value at a dotted key path, creating intermediate tables.
pub fn set_nested_value(root: &mut toml::Value, key: &str, value: toml::Value) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((last, parents)) = parts.split_last().filter(|(last, _)| !last.is_empty()) else {
        return Err(CoreError::config("Empty key path").into());
    };

    let mut current = root;
    for part in parents {
        let table = current
            .as_table_mut()
            .ok_or_else(|| CoreError::config(format!("Cannot navigate into '{part}': not a table")))?;
        current = table
            .entry(part.to_string())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }
    current
        .as_table_mut()
        .ok_or_else(|| CoreError::config("Cannot set key on a non-table value"))?
        .insert(last.to_string(), value);
    Ok(())
}

/// Parses a command-line value: bool, then integer, then float, then string.
pub fn parse_value(s: &str) -> toml::Value {
    match s {
        "true" => toml::Value::Boolean(true),
        "false" => toml::Value::Boolean(false),
        _ => s
            .parse::<i64>()
            .map(toml::Value::Integer)
            .or_else(|_| s.parse::<f64>().map(toml::Value::Float))
            .unwrap_or_else(|_| toml::Value::String(s.to_string())),
    }
}

/// Formats a TOML value for stdout.
pub fn format_toml_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        toml::Value::Array(_) | toml::Value::Table(_) => {
            toml::to_string_pretty(value).unwrap_or_else(|_| format!("{value:?}"))
        }
    }
}
