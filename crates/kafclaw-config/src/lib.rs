//! Layered configuration for the KafClaw agent core (SPEC_FULL §10.3).
//!
//! A single [`Config`] type consolidates the model, policy, runtime,
//! context, memory, scheduler, delivery, sub-agent, and logging settings
//! that the other crates need at startup.
//!
//! # Usage
//!
//! ```rust,no_run
//! use kafclaw_config::Config;
//!
//! let config = Config::load(Some(std::path::Path::new("."))).unwrap();
//! println!("model: {}", config.model.model);
//! ```
//!
//! # Precedence
//!
//! From lowest to highest priority:
//!
//! 1. **Defaults** (`defaults.toml`, compiled into the binary)
//! 2. **System** (`/etc/kafclaw/config.toml`)
//! 3. **User** (`~/.kafclaw/config.toml`)
//! 4. **Workspace** (`{workspace}/.kafclaw/config.toml`) — may only
//!    *tighten* the policy section
//! 5. **Environment** (`KAFCLAW_*`) — fills fields every file layer left
//!    unset
//!
//! # Design
//!
//! This crate has no dependency on any other internal crate. It depends
//! only on `serde`, `toml`, `thiserror`, `tracing`, and `dirs`. The
//! runtime-mutable settings keys from spec §6 (`approval_timeout_seconds`,
//! `daily_token_limit`, the memory overflow counters) are a separate,
//! deliberately decoupled concern — see [`settings`] — since they are
//! read from the metadata store, not a config file.

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging with tighten-only enforcement.
pub mod merge;
/// Runtime-mutable settings keys (spec §6), decoupled from [`Config`].
pub mod settings;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use settings::{MapSettingsSource, Settings, SettingsSource};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`] for the full algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the
    /// final configuration fails validation.
    pub fn load(workspace_root: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(workspace_root, None)
    }

    /// Load configuration with an explicit home directory override, used
    /// by tests and by operators running multiple agent identities on
    /// one host.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the
    /// final configuration fails validation.
    pub fn load_with_home(workspace_root: Option<&std::path::Path>, home_dir: &std::path::Path) -> ConfigResult<Self> {
        loader::load(workspace_root, Some(home_dir))
    }

    /// Load configuration from a single file, with no layering.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
