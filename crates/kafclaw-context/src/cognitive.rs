//! Cognitive-hint classifier — spec §4.5 section (6): a keyword classifier
//! over the user message selecting one of a fixed set of thinking-mode
//! hints appended to the system prompt.

/// A thinking-mode hint the Context Builder injects to steer the LLM's
/// approach for this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CognitiveHint {
    /// Narrow toward a single best answer.
    Convergent,
    /// Broaden to multiple options before narrowing.
    Divergent,
    /// Scrutinize for flaws, risk, or correctness.
    Critical,
    /// Reason about interacting parts and feedback loops.
    Systems,
    /// Adjust approach in response to new information.
    Adaptive,
}

impl CognitiveHint {
    /// The exact instruction text injected for this hint.
    #[must_use]
    pub fn instruction(self) -> &'static str {
        match self {
            Self::Convergent => {
                "Cognitive mode: convergent. Narrow to the single best answer; avoid hedging."
            }
            Self::Divergent => {
                "Cognitive mode: divergent. Consider multiple distinct approaches before choosing."
            }
            Self::Critical => {
                "Cognitive mode: critical. Scrutinize assumptions, risks, and correctness before acting."
            }
            Self::Systems => {
                "Cognitive mode: systems. Reason about how the parts interact, not just the immediate step."
            }
            Self::Adaptive => {
                "Cognitive mode: adaptive. Be ready to revise your approach as new information arrives."
            }
        }
    }
}

const CRITICAL_KEYWORDS: &[&str] = &[
    "bug", "error", "wrong", "broken", "review", "audit", "vulnerab", "risk", "fix",
];
const DIVERGENT_KEYWORDS: &[&str] = &[
    "brainstorm", "options", "alternatives", "ideas", "explore", "could we", "what if",
];
const SYSTEMS_KEYWORDS: &[&str] = &[
    "architecture", "design", "pipeline", "workflow", "end to end", "integration", "dependency",
];
const ADAPTIVE_KEYWORDS: &[&str] = &[
    "changed", "update", "instead", "now that", "pivot", "adjust", "new plan",
];

/// Classify `message` into a [`CognitiveHint`] by keyword match.
///
/// Checked in a fixed priority order (critical, divergent, systems,
/// adaptive) so a message matching more than one keyword set resolves
/// deterministically; falls back to [`CognitiveHint::Convergent`] when
/// nothing matches, since most turns are single-answer requests.
#[must_use]
pub fn classify(message: &str) -> CognitiveHint {
    let lower = message.to_lowercase();

    if CRITICAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return CognitiveHint::Critical;
    }
    if DIVERGENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return CognitiveHint::Divergent;
    }
    if SYSTEMS_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return CognitiveHint::Systems;
    }
    if ADAPTIVE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return CognitiveHint::Adaptive;
    }
    CognitiveHint::Convergent
}
