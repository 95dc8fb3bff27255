//! CLI output styling: color/format helpers shared by every subcommand.

use colored::Colorize;
use kafclaw_core::Tier;

/// Color/formatting helpers for CLI output.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a tier badge for an approval prompt.
    pub(crate) fn tier(tier: Tier) -> String {
        match tier {
            Tier::Read => "read".green().to_string(),
            Tier::Write => "write".yellow().to_string(),
            Tier::HighRisk => "high-risk".red().bold().to_string(),
        }
    }
}

/// Print the startup banner.
pub(crate) fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "{}",
        format!(
            r"
 _   __      __ _____ _
| | / /     / _|  __ \ |
| |/ / __ _| |_| |  \/ | __ ___      __
|    \/ _` |  _| | __| |/ _` \ \ /\ / /
| |\ \ (_| | | | |_\ \ | (_| |\ V  V /
\_| \_\__,_|_|  \____/_|\__,_| \_/\_/
                                   v{version}
"
        )
        .cyan()
    );
    println!("{}", "Multi-channel AI agent runtime".dimmed());
    println!();
}
