//! Config file discovery and layered loading (SPEC_FULL §10.3).
//!
//! Implements `Config::load()`:
//! 1. Parse embedded `defaults.toml` → base.
//! 2. Merge `/etc/kafclaw/config.toml` (system), if present.
//! 3. Merge `~/.kafclaw/config.toml` (user), if present.
//! 4. Merge `{workspace}/.kafclaw/config.toml` (workspace), if present,
//!    then enforce tighten-only restrictions against the pre-workspace
//!    baseline.
//! 5. Apply `KAFCLAW_*` environment variable fallbacks for fields still
//!    unset by every file layer.
//! 6. Deserialize the merged tree into [`Config`].
//! 7. Validate.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{deep_merge, enforce_restrictions};
use crate::types::Config;
use crate::validate;

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MiB) — a guard against a
/// misconfigured or malicious config path, not a realistic limit for a
/// hand-written TOML file.
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the layered configuration.
///
/// `workspace_root` is the root of the current project; if `None`, the
/// workspace layer is skipped. `home_override` substitutes for the real
/// home directory (used by tests and by operators running multiple
/// agent identities on one host).
///
/// # Errors
///
/// Returns a [`ConfigError`] if any present config file is malformed, or
/// if the final merged configuration fails validation.
pub fn load(workspace_root: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<Config> {
    let env_vars = collect_env_vars();
    let home_dir = match home_override {
        Some(h) => h.to_path_buf(),
        None => dirs::home_dir().ok_or(ConfigError::NoHomeDir)?,
    };

    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError { path: "<embedded defaults>".to_owned(), source: e })?;

    let system_path = PathBuf::from("/etc/kafclaw/config.toml");
    if let Some(overlay) = try_load_file(&system_path)? {
        deep_merge(&mut merged, &overlay);
        info!(path = %system_path.display(), "loaded system config");
    }

    let user_path = home_dir.join(".kafclaw").join("config.toml");
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge(&mut merged, &overlay);
        info!(path = %user_path.display(), "loaded user config");
    }

    if let Some(ws_root) = workspace_root {
        let ws_path = ws_root.join(".kafclaw").join("config.toml");
        if let Some(overlay) = try_load_file(&ws_path)? {
            let baseline = merged.clone();
            deep_merge(&mut merged, &overlay);
            enforce_restrictions(&mut merged, &baseline, &overlay);
            info!(path = %ws_path.display(), "loaded workspace config");
        }
    }

    let applied = apply_env_fallbacks(&mut merged, &env_vars);
    if applied > 0 {
        debug!(count = applied, "applied environment variable fallbacks");
    }

    let config: Config =
        merged.try_into().map_err(|e: toml::de::Error| ConfigError::ParseError { path: "<merged config>".to_owned(), source: e })?;

    validate::validate(&config)?;

    Ok(config)
}

/// Load configuration from a single file, with no layering.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError { path: path.display().to_string(), source: e })?;

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!("config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit", content.len()),
        });
    }

    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError { path: path.display().to_string(), source: e })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => return Err(ConfigError::ReadError { path: path.display().to_string(), source: e }),
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!("config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit", content.len()),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError { path: path.display().to_string(), source: e })?;
    Ok(Some(value))
}
