//! Byte-budget discipline for system-prompt section assembly (spec §4.5).

/// Which overflow counter a clipped section contributes to, beyond the
/// always-incremented global total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// RAG recall results.
    Rag,
    /// Dated observation notes.
    Observation,
    /// Working-memory injection.
    WorkingMemory,
    /// Any other section (identity, bootstrap, tool list, etc.) — counted
    /// only in the global total, per spec §4.5.
    Other,
}

/// Per-kind overflow counters, incremented once per clipped/truncated
/// section (spec §8: "overflow counter increments by exactly one per
/// clipped section").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverflowCounters {
    /// Total sections that overflowed, across all kinds.
    pub total: u64,
    /// RAG recall overflows.
    pub rag: u64,
    /// Observation-note overflows.
    pub observation: u64,
    /// Working-memory overflows.
    pub working_memory: u64,
}

/// Fixed budget parameters for one context-build pass.
#[derive(Debug, Clone, Copy)]
pub struct ContextBudget {
    /// Total character budget for the assembled system message.
    pub total_budget: usize,
    /// Per-section cap, floored at 1200 per spec §4.5.
    pub section_cap: usize,
}

impl ContextBudget {
    /// Build a budget, flooring `section_cap` at 1200.
    #[must_use]
    pub fn new(total_budget: usize, section_cap: usize) -> Self {
        Self {
            total_budget,
            section_cap: section_cap.max(1200),
        }
    }
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self::new(16_000, 1200)
    }
}

/// Assembles system-prompt sections under [`ContextBudget`] discipline.
///
/// Each call to [`Self::append_section`] is the Rust shape of the spec's
/// `appendSectionWithBudget(content, sectionCap, remainingBudget)`: content
/// longer than the section cap is hard-truncated with a `...` suffix;
/// content that would exceed the *remaining* total budget is clipped to
/// what's left with no suffix; otherwise it is appended verbatim.
pub struct ContextAssembler {
    budget: ContextBudget,
    remaining: usize,
    overflow: OverflowCounters,
    sections: Vec<String>,
}

impl ContextAssembler {
    /// Start a new assembly pass.
    #[must_use]
    pub fn new(budget: ContextBudget) -> Self {
        Self {
            remaining: budget.total_budget,
            budget,
            overflow: OverflowCounters::default(),
            sections: Vec::new(),
        }
    }

    /// Append one section, applying budget discipline. Empty content is a
    /// no-op (never produces a blank section separator).
    pub fn append_section(&mut self, content: &str, kind: SectionKind) {
        if content.is_empty() {
            return;
        }

        let cap = self.budget.section_cap;
        let (text, overflowed) = if content.chars().count() > cap {
            (hard_truncate(content, cap), true)
        } else if content.chars().count() > self.remaining {
            (clip(content, self.remaining), true)
        } else {
            (content.to_string(), false)
        };

        let consumed = text.chars().count().min(self.remaining);
        self.remaining = self.remaining.saturating_sub(consumed);

        if overflowed {
            self.overflow.total += 1;
            match kind {
                SectionKind::Rag => self.overflow.rag += 1,
                SectionKind::Observation => self.overflow.observation += 1,
                SectionKind::WorkingMemory => self.overflow.working_memory += 1,
                SectionKind::Other => {}
            }
        }

        if !text.is_empty() {
            self.sections.push(text);
        }
    }

    /// Finish the pass, returning the assembled system message (sections
    /// joined by `\n\n---\n\n`) and the overflow counters accumulated.
    #[must_use]
    pub fn finish(self) -> (String, OverflowCounters) {
        (self.sections.join("\n\n---\n\n"), self.overflow)
    }
}

fn hard_truncate(content: &str, cap: usize) -> String {
    let keep = cap.saturating_sub(3);
    let truncated: String = content.chars().take(keep).collect();
    format!("{truncated}...")
}

fn clip(content: &str, remaining: usize) -> String {
    content.chars().take(remaining).collect()
}
