//! Tool-name → skill-domain classifier (spec §4.9, C10).

use std::fmt;

/// A skill domain a tool call is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkillDomain {
    /// File read/write/list operations.
    Filesystem,
    /// Shell/process execution.
    Shell,
    /// Memory store, recall, observation operations.
    Memory,
    /// Web search, fetch, or other research tools.
    Research,
    /// Outbound messaging/notification tools.
    Communication,
    /// Day2Day command-language operations.
    Day2Day,
    /// Anything not matched by a more specific domain.
    General,
}

impl fmt::Display for SkillDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Filesystem => "filesystem",
            Self::Shell => "shell",
            Self::Memory => "memory",
            Self::Research => "research",
            Self::Communication => "communication",
            Self::Day2Day => "day2day",
            Self::General => "general",
        };
        f.write_str(s)
    }
}

/// Classify a tool name (e.g. `"read_file"`, `"mcp:shell.exec"`) into a
/// skill domain. Matching is substring-based against the tool's name
/// (namespace-qualified names are compared whole, so `"server:read_file"`
/// still classifies as filesystem).
#[must_use]
pub fn classify(tool_name: &str) -> SkillDomain {
    let name = tool_name.to_ascii_lowercase();

    const FILESYSTEM: &[&str] = &["read_file", "write_file", "list_directory", "file", "dir"];
    const SHELL: &[&str] = &["exec", "shell", "command", "process"];
    const MEMORY: &[&str] = &["memory", "recall", "observation", "reflect", "rag"];
    const RESEARCH: &[&str] = &["search", "fetch", "browse", "research", "web"];
    const COMMUNICATION: &[&str] = &["send", "notify", "message", "email", "announce"];
    const DAY2DAY: &[&str] = &["day2day", "dtu", "dtp", "dts", "dtn", "dta", "dtc"];

    let matches_any = |patterns: &[&str]| patterns.iter().any(|p| name.contains(p));

    if matches_any(DAY2DAY) {
        SkillDomain::Day2Day
    } else if matches_any(FILESYSTEM) {
        SkillDomain::Filesystem
    } else if matches_any(SHELL) {
        SkillDomain::Shell
    } else if matches_any(MEMORY) {
        SkillDomain::Memory
    } else if matches_any(RESEARCH) {
        SkillDomain::Research
    } else if matches_any(COMMUNICATION) {
        SkillDomain::Communication
    } else {
        SkillDomain::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_builtin_tools() {
        assert_eq!(classify("read_file"), SkillDomain::Filesystem);
        assert_eq!(classify("write_file"), SkillDomain::Filesystem);
        assert_eq!(classify("list_directory"), SkillDomain::Filesystem);
        assert_eq!(classify("exec"), SkillDomain::Shell);
    }

    #[test]
    fn classifies_namespaced_tool_names() {
        assert_eq!(classify("search_server:web_search"), SkillDomain::Research);
        assert_eq!(classify("mail:send_email"), SkillDomain::Communication);
    }

    #[test]
    fn unmatched_tool_is_general() {
        assert_eq!(classify("roll_dice"), SkillDomain::General);
    }

    #[test]
    fn display_matches_lowercase_name() {
        assert_eq!(SkillDomain::Filesystem.to_string(), "filesystem");
    }
}
