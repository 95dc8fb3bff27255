//! Identity block — spec §4.5 section (1): current timestamp plus a
//! precomputed weekday table for ±7 days, so the LLM never has to reason
//! about calendar arithmetic itself.

use chrono::Duration;
use kafclaw_core::Clock;

/// Build the identity block for `agent_name` as of `clock.now()`.
#[must_use]
pub fn identity_block(clock: &dyn Clock, agent_name: &str) -> String {
    let now = clock.now();
    let mut lines = vec![
        format!("You are {agent_name}, an autonomous multi-channel agent."),
        format!("Current time (UTC): {}", now.to_rfc3339()),
        String::new(),
        "Weekday reference (today ± 7 days):".to_string(),
    ];

    for offset in -7..=7 {
        let date = now + Duration::days(offset);
        let marker = if offset == 0 { " (today)" } else { "" };
        lines.push(format!(
            "{}: {}{marker}",
            date.format("%Y-%m-%d"),
            date.format("%A")
        ));
    }

    lines.join("\n")
}
