//! Retention classification by source prefix (spec §3).

use chrono::Duration;

/// How long a chunk is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Never expires by age; only the hard-cap prune can remove it, and
    /// the hard-cap prune is itself restricted to non-permanent chunks —
    /// so in practice this never expires at all.
    Permanent,
    /// Expires `ttl` after the chunk's last update.
    Ttl(Duration),
}

const PERMANENT_PREFIXES: &[&str] = &["soul:", "user", "consolidated:", "observation:"];

/// Classify a chunk's `source` into its retention policy.
///
/// Permanent prefixes are named explicitly by spec §3
/// (`soul:`, `user`, `consolidated:`, `observation:`); the three named
/// TTL classes (`conversation:` 30d, `tool:` 14d, `group:` 60d) are
/// likewise explicit. Anything else falls back to the `conversation:`
/// default of 30 days — spec names no default for unlisted prefixes, and
/// treating unknowns as ephemeral is the conservative choice (a
/// mis-prefixed chunk ages out rather than accumulating forever).
#[must_use]
pub fn classify(source: &str) -> Retention {
    if PERMANENT_PREFIXES.iter().any(|p| source.starts_with(p)) {
        return Retention::Permanent;
    }
    if source.starts_with("conversation:") {
        return Retention::Ttl(Duration::days(30));
    }
    if source.starts_with("tool:") {
        return Retention::Ttl(Duration::days(14));
    }
    if source.starts_with("group:") {
        return Retention::Ttl(Duration::days(60));
    }
    Retention::Ttl(Duration::days(30))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soul_and_user_and_consolidated_and_observation_are_permanent() {
        for source in ["soul:identity", "user", "user:alice", "consolidated:2026-07", "observation:123"] {
            assert_eq!(classify(source), Retention::Permanent, "{source}");
        }
    }

    #[test]
    fn named_ttl_classes_match_spec_durations() {
        assert_eq!(classify("conversation:abc"), Retention::Ttl(Duration::days(30)));
        assert_eq!(classify("tool:bash"), Retention::Ttl(Duration::days(14)));
        assert_eq!(classify("group:family"), Retention::Ttl(Duration::days(60)));
    }

    #[test]
    fn unknown_prefix_falls_back_to_thirty_days() {
        assert_eq!(classify("scratch:whatever"), Retention::Ttl(Duration::days(30)));
    }
}
