//! The Context Builder (spec §4.5, C6): assembles the system message and
//! trailing history for one Agent Loop turn.

use std::collections::BTreeMap;
use std::path::Path;

use kafclaw_core::{Clock, MessageType};

use crate::budget::{ContextAssembler, ContextBudget, OverflowCounters, SectionKind};
use crate::cognitive;
use crate::trust::wrap_untrusted;

/// One prior turn inlined into the message list verbatim. Callers
/// (`kafclaw-runtime`) are responsible for excluding the current user
/// message and passing at most the last 50 entries — the builder itself
/// just caps defensively.
#[derive(Debug, Clone)]
pub struct HistoryMessage {
    /// `user` | `assistant` | `tool` | `system`.
    pub role: String,
    /// Message text.
    pub content: String,
}

/// A scored recall result from RAG or the memory store.
#[derive(Debug, Clone)]
pub struct RecallResult {
    /// Recalled text.
    pub content: String,
    /// Relevance score in `[0, 1]`.
    pub score: f64,
}

/// One tool's entry in the tool-list summary section.
#[derive(Debug, Clone)]
pub struct ToolSummary {
    /// Tool name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Severity tier, as its numeric value.
    pub tier: u8,
}

/// A dated, prioritized note produced by the Memory Observer.
#[derive(Debug, Clone)]
pub struct ObservationNote {
    /// `YYYY-MM-DD`.
    pub date: String,
    /// `high` | `medium` | `low`.
    pub priority: String,
    /// Note text.
    pub content: String,
}

/// Everything the Context Builder needs to assemble one turn.
pub struct ContextRequest<'a> {
    /// Name the agent refers to itself as in the identity block.
    pub agent_name: &'a str,
    /// Workspace root bootstrap files are loaded from.
    pub workspace_root: &'a Path,
    /// Channel this turn arrived on.
    pub channel: &'a str,
    /// Chat id this turn belongs to.
    pub chat_id: &'a str,
    /// Whether this turn originated internally or externally.
    pub message_type: MessageType,
    /// The current user message (used only for cognitive-hint classification).
    pub user_message: &'a str,
    /// Tools available this turn.
    pub tools: &'a [ToolSummary],
    /// Legacy static memory text, loaded verbatim if non-empty.
    pub legacy_static_memory: &'a str,
    /// Working memory scoped to the active resource.
    pub working_memory_resource_scoped: &'a [String],
    /// Working memory scoped to the active thread.
    pub working_memory_thread_scoped: &'a [String],
    /// Observation notes available for this session.
    pub observations: &'a [ObservationNote],
    /// Unfiltered RAG recall candidates.
    pub rag_results: &'a [RecallResult],
    /// Minimum score (clamped to `[0,1]`) for a RAG result to be included.
    pub rag_score_threshold: f64,
    /// Requested RAG result count, clamped to `[1, max_rag_top_k]`.
    pub rag_top_k: usize,
    /// Upper bound for `rag_top_k`.
    pub max_rag_top_k: usize,
    /// Prior turns, already excluding the current user message.
    pub history: &'a [HistoryMessage],
}

/// The assembled output of one context-build pass.
pub struct BuiltContext {
    /// The single system message, sections joined by `\n\n---\n\n`.
    pub system_message: String,
    /// Up to the last 50 history entries, inlined verbatim.
    pub history: Vec<HistoryMessage>,
    /// Overflow counters accumulated while assembling `system_message`.
    ///
    /// The caller (`kafclaw-runtime`) is responsible for persisting a
    /// `MEMORY_CONTEXT_OVERFLOW` TimelineEvent when `overflow.total > 0` —
    /// this crate has no TimelineEvent concept of its own.
    pub overflow: OverflowCounters,
}

/// Builds the layered system prompt described in spec §4.5.
pub struct ContextBuilder {
    budget: ContextBudget,
}

impl ContextBuilder {
    /// Build a context builder under the given byte budget.
    #[must_use]
    pub fn new(budget: ContextBudget) -> Self {
        Self { budget }
    }

    /// Assemble one turn's system message and trailing history.
    ///
    /// Sections are appended in the fixed order spec §4.5 names: identity,
    /// bootstrap files, legacy static memory, tool-list summary,
    /// per-request context, cognitive hint, working memory, dated
    /// observations, RAG recall.
    #[must_use]
    pub fn build(&self, clock: &dyn Clock, req: &ContextRequest<'_>) -> BuiltContext {
        let mut asm = ContextAssembler::new(self.budget);

        asm.append_section(
            &crate::identity::identity_block(clock, req.agent_name),
            SectionKind::Other,
        );

        asm.append_section(
            &crate::bootstrap::load_bootstrap_files(req.workspace_root),
            SectionKind::Other,
        );

        asm.append_section(req.legacy_static_memory, SectionKind::Other);

        asm.append_section(&tool_list_summary(req.tools), SectionKind::Other);

        asm.append_section(&per_request_context(req), SectionKind::Other);

        let hint = cognitive::classify(req.user_message);
        asm.append_section(hint.instruction(), SectionKind::Other);

        asm.append_section(&working_memory_section(req), SectionKind::WorkingMemory);

        asm.append_section(&observation_section(req.observations), SectionKind::Observation);

        asm.append_section(&rag_section(req), SectionKind::Rag);

        let (system_message, overflow) = asm.finish();
        let history = last_n(req.history, 50);

        BuiltContext {
            system_message,
            history,
            overflow,
        }
    }
}

fn tool_list_summary(tools: &[ToolSummary]) -> String {
    if tools.is_empty() {
        return String::new();
    }
    let mut lines = vec!["Available tools:".to_string()];
    for tool in tools {
        lines.push(format!("- {} (tier {}): {}", tool.name, tool.tier, tool.description));
    }
    lines.join("\n")
}

fn per_request_context(req: &ContextRequest<'_>) -> String {
    let framing = match req.message_type {
        MessageType::Internal => {
            "This turn originates internally: system internals are unlocked."
        }
        MessageType::External => {
            "This turn originates externally: system internals remain restricted."
        }
    };
    format!("Channel: {}\nChat: {}\n{framing}", req.channel, req.chat_id)
}

fn working_memory_section(req: &ContextRequest<'_>) -> String {
    let mut lines = Vec::new();
    for item in req.working_memory_resource_scoped {
        lines.push(wrap_untrusted("working-memory:resource", item));
    }
    for item in req.working_memory_thread_scoped {
        lines.push(wrap_untrusted("working-memory:thread", item));
    }
    lines.join("\n\n")
}

fn observation_section(observations: &[ObservationNote]) -> String {
    let mut by_date: BTreeMap<&str, Vec<&ObservationNote>> = BTreeMap::new();
    for obs in observations {
        by_date.entry(obs.date.as_str()).or_default().push(obs);
    }

    let mut blocks = Vec::new();
    for (date, notes) in by_date {
        let mut block = vec![format!("## {date}")];
        for note in notes {
            block.push(format!("- [{}] {}", note.priority.to_uppercase(), note.content));
        }
        blocks.push(block.join("\n"));
    }
    blocks.join("\n\n")
}

fn rag_section(req: &ContextRequest<'_>) -> String {
    let threshold = req.rag_score_threshold.clamp(0.0, 1.0);
    let top_k = req.rag_top_k.clamp(1, req.max_rag_top_k.max(1));

    let mut filtered: Vec<&RecallResult> = req
        .rag_results
        .iter()
        .filter(|r| r.score >= threshold)
        .collect();
    filtered.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    filtered.truncate(top_k);

    filtered
        .iter()
        .map(|r| wrap_untrusted("rag", &r.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn last_n(history: &[HistoryMessage], n: usize) -> Vec<HistoryMessage> {
    let start = history.len().saturating_sub(n);
    history[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafclaw_core::SystemClock;

    fn base_request<'a>(workspace_root: &'a Path) -> ContextRequest<'a> {
        ContextRequest {
            agent_name: "kafclaw",
            workspace_root,
            channel: "whatsapp",
            chat_id: "+1555",
            message_type: MessageType::Internal,
            user_message: "hello",
            tools: &[],
            legacy_static_memory: "",
            working_memory_resource_scoped: &[],
            working_memory_thread_scoped: &[],
            observations: &[],
            rag_results: &[],
            rag_score_threshold: 0.3,
            rag_top_k: 5,
            max_rag_top_k: 10,
            history: &[],
        }
    }

    #[test]
    fn builds_system_message_with_identity_and_per_request_context() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ContextBuilder::new(ContextBudget::default());
        let built = builder.build(&SystemClock, &base_request(dir.path()));
        assert!(built.system_message.contains("kafclaw"));
        assert!(built.system_message.contains("Channel: whatsapp"));
        assert_eq!(built.overflow.total, 0);
    }

    #[test]
    fn rag_filters_below_threshold_and_clamps_top_k() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![
            RecallResult { content: "low score".to_string(), score: 0.1 },
            RecallResult { content: "high score a".to_string(), score: 0.9 },
            RecallResult { content: "high score b".to_string(), score: 0.8 },
        ];
        let mut req = base_request(dir.path());
        req.rag_results = &results;
        req.rag_top_k = 1;

        let builder = ContextBuilder::new(ContextBudget::default());
        let built = builder.build(&SystemClock, &req);

        assert!(built.system_message.contains("high score a"));
        assert!(!built.system_message.contains("high score b"));
        assert!(!built.system_message.contains("low score"));
    }

    #[test]
    fn observations_grouped_under_dated_headers() {
        let dir = tempfile::tempdir().unwrap();
        let observations = vec![
            ObservationNote { date: "2026-07-27".to_string(), priority: "high".to_string(), content: "deployed v2".to_string() },
            ObservationNote { date: "2026-07-27".to_string(), priority: "low".to_string(), content: "minor typo fixed".to_string() },
        ];
        let mut req = base_request(dir.path());
        req.observations = &observations;

        let builder = ContextBuilder::new(ContextBudget::default());
        let built = builder.build(&SystemClock, &req);

        assert!(built.system_message.contains("## 2026-07-27"));
        assert!(built.system_message.contains("[HIGH] deployed v2"));
    }

    #[test]
    fn history_is_capped_at_last_fifty() {
        let dir = tempfile::tempdir().unwrap();
        let history: Vec<HistoryMessage> = (0..60)
            .map(|i| HistoryMessage { role: "user".to_string(), content: format!("msg {i}") })
            .collect();
        let mut req = base_request(dir.path());
        req.history = &history;

        let builder = ContextBuilder::new(ContextBudget::default());
        let built = builder.build(&SystemClock, &req);

        assert_eq!(built.history.len(), 50);
        assert_eq!(built.history[0].content, "msg 10");
        assert_eq!(built.history.last().unwrap().content, "msg 59");
    }

    #[test]
    fn external_message_type_restricts_internals_in_framing() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = base_request(dir.path());
        req.message_type = MessageType::External;
        let builder = ContextBuilder::new(ContextBudget::default());
        let built = builder.build(&SystemClock, &req);
        assert!(built.system_message.contains("restricted"));
    }
}
