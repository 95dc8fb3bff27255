//! Attack-intent regex filter (spec §4.6 step 3, §9 Design Notes:
//! "defense-in-depth only; ... not correctness gates and must not be
//! tightened in a way that blocks legitimate flows").

use std::sync::LazyLock;

use regex::RegexSet;

/// The fixed refusal text returned when a pattern matches. No LLM call is
/// made for these.
pub const REFUSAL_TEXT: &str =
    "I can't help with that request. It looks like it's asking for a destructive or \
     irreversible action, which I won't carry out.";

static PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)delete\s+(the\s+)?(entire\s+)?repo(sitory)?",
        r"(?i)rm\s+-rf\s+",
        r"(?i)format\s+(the\s+)?(hard\s+)?drive",
        r"(?i)wipe\s+(the\s+)?(entire\s+)?(disk|drive|database)",
        r"(?i)drop\s+(the\s+)?database",
        r"(?i)lösche?\s+(das\s+)?(ganze\s+)?repo",
    ])
    .expect("attack-intent patterns are a fixed, valid pattern set")
});

/// Returns `true` if `content` matches any pattern in the attack-intent
/// blocklist.
#[must_use]
pub fn matches(content: &str) -> bool {
    PATTERNS.is_match(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_rm_rf() {
        assert!(matches("please run rm -rf / on the server"));
    }

    #[test]
    fn flags_delete_repo_english_and_german() {
        assert!(matches("delete the entire repo right now"));
        assert!(matches("lösche das ganze repo"));
    }

    #[test]
    fn does_not_flag_legitimate_requests() {
        assert!(!matches("can you delete this one stale branch?"));
        assert!(!matches("please read the README and summarize it"));
        assert!(!matches("write a test for the delivery worker"));
    }
}
