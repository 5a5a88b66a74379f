//! Shared scaffolding for CLI integration tests.
#![allow(dead_code)] // Not every test crate uses every helper.
use std::path::Path;

use assert_cmd::Command;

/// `[checks]` thresholds low enough to pass on any CI host.
pub const LOW_CHECKS: &str = "[checks]\nmin_memory_mb = 1\nmin_disk_mb = 1\n";

/// Build a `provision` command pointed at `root` with `home` as an isolated
/// HOME (cache and error logs land under it).
pub fn provision_cmd(root: &Path, home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("provision").expect("binary builds");
    cmd.env("HOME", home)
        .env("XDG_CACHE_HOME", home.join(".cache"))
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("DOTFILES_DIR")
        .env_remove("LOG_FORMAT")
        .arg("--root")
        .arg(root);
    cmd
}

/// Write `provision.toml` at the root.
pub fn write_manifest(root: &Path, contents: &str) {
    std::fs::write(root.join("provision.toml"), contents).expect("manifest written");
}

/// Create a source file under the dotfiles root.
pub fn scaffold_source(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("source parent created");
    }
    std::fs::write(path, content).expect("source written");
}

/// Names of `provision_error_*.log` files in `home`.
pub fn error_logs(home: &Path) -> Vec<String> {
    std::fs::read_dir(home)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().to_string())
                .filter(|n| n.starts_with("provision_error_") && n.ends_with(".log"))
                .collect()
        })
        .unwrap_or_default()
}
