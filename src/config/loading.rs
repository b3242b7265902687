//! Configuration loading: path resolution, TOML parsing, environment overrides.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::Config;
use super::validation::validate_config;
use crate::constants::{APP_DIR_NAME, CONFIG_FILE_NAME};

/// Global configuration directory, set once at startup
static CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

const DEFAULT_CONFIG_DIRS: &str = "/etc/xdg";

/// Set the configuration directory for the current process.
///
/// Can only be called once, typically from argument parsing.
pub fn set_config_dir(dir: Option<String>) -> Result<()> {
    CONFIG_DIR
        .set(dir.map(PathBuf::from))
        .map_err(|_| anyhow::anyhow!("Configuration directory already set"))
}

/// The directory given with `--config`, if any.
pub fn get_custom_config_dir() -> Option<PathBuf> {
    CONFIG_DIR.get().and_then(|d| d.clone())
}

/// The user configuration file path (which may not exist).
pub fn get_config_path() -> Result<PathBuf> {
    if let Some(dir) = get_custom_config_dir() {
        return Ok(dir.join(CONFIG_FILE_NAME));
    }
    let base = dirs::config_dir().context("Could not determine the config directory")?;
    Ok(base.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// First existing config file among `XDG_CONFIG_DIRS`.
fn find_system_config() -> Option<PathBuf> {
    let dirs = std::env::var("XDG_CONFIG_DIRS")
        .ok()
        .filter(|dirs| !dirs.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_DIRS.to_string());

    std::env::split_paths(&dirs)
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}

/// The config file that [`load`] will read.
pub fn resolve_config_path() -> Result<PathBuf> {
    let user_path = get_config_path()?;
    if user_path.exists() || get_custom_config_dir().is_some() {
        return Ok(user_path);
    }
    Ok(find_system_config().unwrap_or(user_path))
}

/// Load configuration from `path`.
///
/// A missing file yields the default configuration. Environment overrides are
/// applied before validation so they are validated too.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        parse_config(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse TOML text into a [`Config`] without validating it.
pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Apply `DARKMAN_*` overrides, reading variables through `lookup`.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let float = |key: &str| -> Result<Option<f64>> {
        lookup(key)
            .map(|value| {
                value
                    .trim()
                    .parse::<f64>()
                    .with_context(|| format!("{key} is not a number: {value:?}"))
            })
            .transpose()
    };
    let boolean = |key: &str| -> Result<Option<bool>> {
        lookup(key).map(|value| parse_bool(key, &value)).transpose()
    };

    if let Some(lat) = float("DARKMAN_LAT")? {
        config.lat = Some(lat);
    }
    if let Some(lng) = float("DARKMAN_LNG")? {
        config.lng = Some(lng);
    }
    if let Some(alt) = float("DARKMAN_ALT")? {
        config.alt = Some(alt);
    }
    if let Some(sunrise) = lookup("DARKMAN_SUNRISE") {
        config.sunrise = Some(sunrise);
    }
    if let Some(sunset) = lookup("DARKMAN_SUNSET") {
        config.sunset = Some(sunset);
    }
    if let Some(usegeoclue) = boolean("DARKMAN_USEGEOCLUE")? {
        config.usegeoclue = Some(usegeoclue);
    }
    if let Some(dbusserver) = boolean("DARKMAN_DBUSSERVER")? {
        config.dbusserver = Some(dbusserver);
    }
    if let Some(portal) = boolean("DARKMAN_PORTAL")? {
        config.portal = Some(portal);
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => bail!("{key} is not a boolean: {other:?}"),
    }
}
