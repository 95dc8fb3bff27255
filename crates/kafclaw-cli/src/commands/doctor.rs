//! `kafclaw doctor` — startup health checks: config resolution, storage
//! backend connectivity, and audit chain validity.

use colored::Colorize;
use kafclaw_config::Config;

/// Run health checks against the resolved configuration and storage
/// backend for `workspace_root`.
pub(crate) async fn run_doctor(workspace_root: &std::path::Path) -> anyhow::Result<()> {
    println!("{}", "KafClaw Doctor - System Health Check".cyan().bold());
    println!();

    print!("  Checking configuration... ");
    match Config::load(Some(workspace_root)) {
        Ok(config) => {
            println!("{}", "OK".green());
            println!("    Model: {}", config.model.model);
            println!("    Policy: max_auto_tier={} external_max_tier={}", config.policy.max_auto_tier, config.policy.external_max_tier);
        }
        Err(e) => {
            println!("{}", "WARN".yellow());
            println!("    Using defaults: {e}");
        }
    }

    print!("  Checking embedded storage backend... ");
    let data_dir = workspace_root.join(".kafclaw").join("data");
    std::fs::create_dir_all(&data_dir)?;
    match kafclaw_storage::Database::connect_embedded(&data_dir.to_string_lossy()).await {
        Ok(_) => println!("{}", "OK".green()),
        Err(e) => println!("{} ({e})", "FAIL".red()),
    }

    print!("  Checking audit chain... ");
    let audit_path = workspace_root.join(".kafclaw").join("audit.jsonl");
    if audit_path.exists() {
        match kafclaw_audit::verify_chain(&audit_path)? {
            kafclaw_audit::ChainVerification::Valid => println!("{}", "OK".green()),
            kafclaw_audit::ChainVerification::Broken { line, reason } => {
                println!("{} (line {line}: {reason})", "FAIL".red());
            }
        }
    } else {
        println!("{} (no audit log yet)", "SKIP".dimmed());
    }

    Ok(())
}
