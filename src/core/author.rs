//! Comment authorship
//!
//! Resolution order: explicit name (flag or `MARGINALIA_AUTHOR`), then the
//! git user name configured for the workspace, then a fixed default.

use std::path::Path;
use std::process::Command;

use crate::core::util::command_exists;

pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// `git config user.name` as seen from `root`
fn git_user_name(root: &Path) -> Option<String> {
    if !command_exists("git") {
        return None;
    }

    let output = Command::new("git")
        .current_dir(root)
        .args(["config", "user.name"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// Pick the author name for new comments and replies
pub fn resolve_author(explicit: Option<&str>, root: &Path) -> String {
    if let Some(name) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    git_user_name(root).unwrap_or_else(|| {
        tracing::debug!("no git user configured, using default author");
        DEFAULT_AUTHOR.to_string()
    })
}
