//! Layer identifiers for the config precedence chain.

/// Which layer of the precedence chain a value last came from
/// (SPEC_FULL §10.3: defaults → system → user → workspace → environment).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults.
    Defaults,
    /// `/etc/kafclaw/config.toml`.
    System,
    /// `~/.kafclaw/config.toml`.
    User,
    /// `{workspace}/.kafclaw/config.toml`.
    Workspace,
    /// `KAFCLAW_*` environment variable fallback.
    Environment,
}
