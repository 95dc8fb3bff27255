//! Day2Day command interception (spec §4.6 step 4, §6: "`dtu` (update
//! tasks), `dtp` (progress note), `dts` (consolidate), `dtn` (next
//! step), `dta` (all open), `dtc` (close capture). A capture mode
//! allows multi-line input; `dtc` commits. A status query contains both
//! `status` and one of {`task`, `aufgabe`, `day2day`} with an optional
//! ISO date or `yesterday`/`tomorrow`/`gestern`/`morgen` token.").
//!
//! The on-disk markdown manipulations these commands ultimately drive
//! are out of this core's scope (spec §1 Non-goals); this module only
//! recognizes and parses the command surface so the Agent Loop knows to
//! intercept it before the LLM sees it.

use chrono::{Duration, NaiveDate};

/// One recognized Day2Day command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `dtu` — update tasks.
    UpdateTasks,
    /// `dtp <note>` — progress note.
    Progress(String),
    /// `dts` — consolidate.
    Consolidate,
    /// `dtn` — next step.
    NextStep,
    /// `dta` — all open tasks.
    AllOpen,
    /// `dtc` — close capture, committing buffered lines.
    CloseCapture,
    /// A status query, resolved to a concrete date relative to `today`.
    StatusQuery { date: Option<NaiveDate> },
}

/// Parse one line of input as a Day2Day command, given `today` for
/// relative date resolution. Returns `None` if the line is not a
/// recognized Day2Day command — the caller should then fall through to
/// capture-mode buffering or normal LLM processing.
#[must_use]
pub fn parse(line: &str, today: NaiveDate) -> Option<Command> {
    let trimmed = line.trim();
    let lower = trimmed.to_lowercase();

    match lower.as_str() {
        "dtu" => return Some(Command::UpdateTasks),
        "dts" => return Some(Command::Consolidate),
        "dtn" => return Some(Command::NextStep),
        "dta" => return Some(Command::AllOpen),
        "dtc" => return Some(Command::CloseCapture),
        _ => {}
    }

    if lower == "dtp" || lower.starts_with("dtp ") {
        let rest = trimmed[3..].trim().to_string();
        return Some(Command::Progress(rest));
    }

    if is_status_query(&lower) {
        return Some(Command::StatusQuery {
            date: resolve_status_date(&lower, today),
        });
    }

    None
}

fn is_status_query(lower: &str) -> bool {
    lower.contains("status") && ["task", "aufgabe", "day2day"].iter().any(|kw| lower.contains(kw))
}

fn resolve_status_date(lower: &str, today: NaiveDate) -> Option<NaiveDate> {
    if lower.contains("yesterday") || lower.contains("gestern") {
        return Some(today - Duration::days(1));
    }
    if lower.contains("tomorrow") || lower.contains("morgen") {
        return Some(today + Duration::days(1));
    }
    for token in lower.split_whitespace() {
        if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
            return Some(date);
        }
    }
    None
}

/// Buffers multi-line capture-mode input until `dtc` commits it.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    lines: Vec<String>,
    active: bool,
}

impl CaptureBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start(&mut self) {
        self.active = true;
        self.lines.clear();
    }

    /// Append a line while in capture mode.
    pub fn push_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    /// Commit the buffer, returning its joined contents and resetting to
    /// an inactive, empty state.
    pub fn commit(&mut self) -> String {
        self.active = false;
        self.lines.drain(..).collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 29).unwrap()
    }

    #[test]
    fn parses_single_word_commands_case_insensitively() {
        assert_eq!(parse("DTU", today()), Some(Command::UpdateTasks));
        assert_eq!(parse("dts", today()), Some(Command::Consolidate));
        assert_eq!(parse("dtn", today()), Some(Command::NextStep));
        assert_eq!(parse("dta", today()), Some(Command::AllOpen));
        assert_eq!(parse("dtc", today()), Some(Command::CloseCapture));
    }

    #[test]
    fn parses_progress_note_with_remainder() {
        let cmd = parse("dtp finished the audit chain module", today());
        assert_eq!(
            cmd,
            Some(Command::Progress("finished the audit chain module".to_string()))
        );
    }

    #[test]
    fn parses_status_query_with_relative_tokens() {
        let cmd = parse("status of day2day yesterday", today());
        assert_eq!(
            cmd,
            Some(Command::StatusQuery {
                date: Some(today() - Duration::days(1))
            })
        );

        let cmd = parse("task status morgen", today());
        assert_eq!(
            cmd,
            Some(Command::StatusQuery {
                date: Some(today() + Duration::days(1))
            })
        );
    }

    #[test]
    fn parses_status_query_with_iso_date() {
        let cmd = parse("aufgabe status 2026-07-01", today());
        assert_eq!(
            cmd,
            Some(Command::StatusQuery {
                date: Some(NaiveDate::from_ymd_opt(2026, 7, 1).unwrap())
            })
        );
    }

    #[test]
    fn non_command_text_is_not_recognized() {
        assert_eq!(parse("what's the weather today?", today()), None);
    }

    #[test]
    fn capture_buffer_commits_joined_lines() {
        let mut buf = CaptureBuffer::new();
        buf.start();
        assert!(buf.is_active());
        buf.push_line("first");
        buf.push_line("second");
        let committed = buf.commit();
        assert_eq!(committed, "first\nsecond");
        assert!(!buf.is_active());
    }
}
