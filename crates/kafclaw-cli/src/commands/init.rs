//! `kafclaw init` — initialize a workspace.

use crate::theme::Theme;

/// Initialize the current directory as a KafClaw workspace.
pub(crate) fn run_init() -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let dot_kafclaw = cwd.join(".kafclaw");

    if dot_kafclaw.exists() {
        println!("{}", Theme::info(&format!("Workspace already initialized at {}", cwd.display())));
        return Ok(());
    }

    std::fs::create_dir_all(&dot_kafclaw)?;

    let config_path = dot_kafclaw.join("config.toml");
    if !config_path.exists() {
        std::fs::write(
            &config_path,
            "# KafClaw workspace configuration.\n\
             # Uncomment and edit; a bare or missing section uses its defaults.\n\
             \n\
             # [model]\n\
             # model = \"gpt-4o-mini\"\n\
             # max_tokens = 4096\n\
             # temperature = 0.7\n\
             \n\
             # [policy]\n\
             # max_auto_tier = 1\n\
             # external_max_tier = 0\n\
             \n\
             # [logging]\n\
             # level = \"info\"\n\
             # format = \"pretty\"\n",
        )?;
    }

    println!("{}", Theme::success(&format!("Initialized workspace at {}", dot_kafclaw.display())));
    Ok(())
}
