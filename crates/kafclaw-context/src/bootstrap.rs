//! Bootstrap ("soul") file loading — spec §4.5 section (2): "bootstrap
//! files loaded verbatim from the workspace".
//!
//! Grounded on the teacher's `astrid-tools::instructions::load_project_instructions`:
//! a global file under the user's home directory, then a workspace-root
//! file taking priority, with an additive `.kafclaw/` directory variant and
//! a legacy-name fallback when the primary name is absent.

use std::path::Path;

/// Load bootstrap/soul files for a workspace.
///
/// Order: `~/.kafclaw/instructions.md` (global, always additive), then
/// `KAFCLAW.md` at the workspace root (priority) plus `.kafclaw/KAFCLAW.md`
/// (additive); if no `KAFCLAW.md` exists, falls back to `AGENTS.md` and
/// `.kafclaw/AGENTS.md` for compatibility with pre-existing workspaces.
/// Sections are joined with `\n\n---\n\n`; returns an empty string if
/// nothing is found.
#[must_use]
pub fn load_bootstrap_files(workspace_root: &Path) -> String {
    let mut sections = Vec::new();

    if let Some(home) = dirs::home_dir() {
        read_nonempty(&home.join(".kafclaw").join("instructions.md"), &mut sections);
    }

    let primary = workspace_root.join("KAFCLAW.md");
    if primary.exists() {
        read_nonempty(&primary, &mut sections);
        read_nonempty(&workspace_root.join(".kafclaw").join("KAFCLAW.md"), &mut sections);
    } else {
        let dotdir = workspace_root.join(".kafclaw").join("KAFCLAW.md");
        if dotdir.exists() {
            read_nonempty(&dotdir, &mut sections);
        } else {
            read_nonempty(&workspace_root.join("AGENTS.md"), &mut sections);
            read_nonempty(&workspace_root.join(".kafclaw").join("AGENTS.md"), &mut sections);
        }
    }

    sections.join("\n\n---\n\n")
}

fn read_nonempty(path: &Path, sections: &mut Vec<String>) {
    if let Ok(content) = std::fs::read_to_string(path) {
        if !content.trim().is_empty() {
            sections.push(content);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_files_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_bootstrap_files(dir.path()).is_empty());
    }

    #[test]
    fn primary_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("KAFCLAW.md"), "# Rules").unwrap();
        assert!(load_bootstrap_files(dir.path()).contains("# Rules"));
    }

    #[test]
    fn dot_dir_is_additive_with_primary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("KAFCLAW.md"), "# Root").unwrap();
        std::fs::create_dir(dir.path().join(".kafclaw")).unwrap();
        std::fs::write(dir.path().join(".kafclaw").join("KAFCLAW.md"), "# Dir").unwrap();
        let content = load_bootstrap_files(dir.path());
        assert!(content.contains("# Root"));
        assert!(content.contains("# Dir"));
    }

    #[test]
    fn fallback_name_used_only_when_primary_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("AGENTS.md"), "# Legacy").unwrap();
        let content = load_bootstrap_files(dir.path());
        assert!(content.contains("# Legacy"));

        std::fs::write(dir.path().join("KAFCLAW.md"), "# New").unwrap();
        let content = load_bootstrap_files(dir.path());
        assert!(content.contains("# New"));
        assert!(!content.contains("# Legacy"));
    }
}
