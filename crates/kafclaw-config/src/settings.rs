//! Typed view over the spec §6 settings keys (`approval_timeout_seconds`,
//! `daily_token_limit`, `memory_overflow_events_total`,
//! `memory_overflow_events_<kind>`).
//!
//! These keys are runtime string→string state (the overflow counters are
//! incremented continuously by the Context Builder, not read from a
//! static file), so they are modeled separately from the layered
//! [`crate::Config`]: a [`SettingsSource`] trait any key-value backend can
//! implement (this crate stays dependency-free per SPEC_FULL §10.3; the
//! metadata-store adapter lives in `kafclaw-runtime`), and a typed
//! [`Settings`] wrapper with `get_or` semantics — "all optional; malformed
//! values fall back to defaults" (spec §6).

use std::collections::HashMap;

/// A source of string-keyed settings. Implemented by the metadata store
/// adapter in `kafclaw-runtime` against the real `KvStore`; a plain
/// `HashMap` ([`MapSettingsSource`]) suffices for tests and single-process
/// demos.
pub trait SettingsSource {
    /// Look up a raw setting value by key.
    fn get(&self, key: &str) -> Option<String>;
}

/// An in-memory [`SettingsSource`] backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct MapSettingsSource(pub HashMap<String, String>);

impl SettingsSource for MapSettingsSource {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// Typed accessor over a [`SettingsSource`], implementing the spec §6
/// contract: every key is optional, and a malformed value falls back to
/// the caller-supplied default rather than erroring.
pub struct Settings<'a> {
    source: &'a dyn SettingsSource,
}

impl<'a> Settings<'a> {
    /// Wrap a settings source.
    #[must_use]
    pub fn new(source: &'a dyn SettingsSource) -> Self {
        Self { source }
    }

    /// Raw string lookup with a default for an absent key.
    #[must_use]
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.source.get(key).unwrap_or_else(|| default.to_string())
    }

    /// `u64` lookup; a missing or unparseable value falls back to
    /// `default`.
    #[must_use]
    pub fn get_u64_or(&self, key: &str, default: u64) -> u64 {
        self.source.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    /// `approval_timeout_seconds` (spec §4.4: "Approval timeout is a
    /// settings value (default 60s)").
    #[must_use]
    pub fn approval_timeout_seconds(&self, default: u64) -> u64 {
        self.get_u64_or("approval_timeout_seconds", default)
    }

    /// `daily_token_limit` (spec §4.6 step 7).
    #[must_use]
    pub fn daily_token_limit(&self, default: u64) -> u64 {
        self.get_u64_or("daily_token_limit", default)
    }

    /// `memory_overflow_events_total` (spec §4.5).
    #[must_use]
    pub fn memory_overflow_events_total(&self, default: u64) -> u64 {
        self.get_u64_or("memory_overflow_events_total", default)
    }

    /// `memory_overflow_events_<kind>` for `kind` in `{rag, observation,
    /// working_memory}` (spec §4.5).
    #[must_use]
    pub fn memory_overflow_events_kind(&self, kind: &str, default: u64) -> u64 {
        self.get_u64_or(&format!("memory_overflow_events_{kind}"), default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> MapSettingsSource {
        MapSettingsSource(pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect())
    }

    #[test]
    fn missing_key_falls_back_to_default() {
        let src = source(&[]);
        let settings = Settings::new(&src);
        assert_eq!(settings.approval_timeout_seconds(60), 60);
        assert_eq!(settings.daily_token_limit(200_000), 200_000);
    }

    #[test]
    fn present_key_overrides_default() {
        let src = source(&[("approval_timeout_seconds", "120")]);
        let settings = Settings::new(&src);
        assert_eq!(settings.approval_timeout_seconds(60), 120);
    }

    #[test]
    fn malformed_value_falls_back_never_panics() {
        let src = source(&[("daily_token_limit", "not-a-number")]);
        let settings = Settings::new(&src);
        assert_eq!(settings.daily_token_limit(200_000), 200_000);
    }

    #[test]
    fn overflow_kind_key_is_formatted_per_kind() {
        let src = source(&[("memory_overflow_events_rag", "3"), ("memory_overflow_events_observation", "1")]);
        let settings = Settings::new(&src);
        assert_eq!(settings.memory_overflow_events_kind("rag", 0), 3);
        assert_eq!(settings.memory_overflow_events_kind("observation", 0), 1);
        assert_eq!(settings.memory_overflow_events_kind("working_memory", 0), 0);
    }
}
