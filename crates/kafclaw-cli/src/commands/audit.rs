//! `kafclaw audit verify` — walk the audit chain and report its state.

use colored::Colorize;
use kafclaw_audit::ChainVerification;

/// Verify the hash chain of the workspace's audit log.
pub(crate) fn verify_audit_chain(workspace_root: &std::path::Path) -> anyhow::Result<()> {
    let path = workspace_root.join(".kafclaw").join("audit.jsonl");
    if !path.exists() {
        println!("No audit log found at {}", path.display());
        return Ok(());
    }

    match kafclaw_audit::verify_chain(&path)? {
        ChainVerification::Valid => {
            println!("{}", "Audit chain is valid.".green());
        }
        ChainVerification::Broken { line, reason } => {
            println!("{} at line {line}: {reason}", "Audit chain is broken".red().bold());
            anyhow::bail!("audit chain broken at line {line}: {reason}");
        }
    }
    Ok(())
}
