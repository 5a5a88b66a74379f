//! TOML manifest: the declarative description of one provisioning run.
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::action::Action;
use crate::error::ManifestError;

/// The parsed `provision.toml` manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Directories to create (idempotently) before linking.
    #[serde(default)]
    pub directories: Vec<String>,
    /// Host validation thresholds.
    #[serde(default)]
    pub checks: Checks,
    /// Tools to detect and, if absent, provision.
    #[serde(default)]
    pub tools: Vec<ToolEntry>,
    /// Dotfiles to symlink into place.
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

/// Host validation thresholds from the `[checks]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Checks {
    /// Minimum total memory in MB.
    #[serde(default = "default_min_memory_mb")]
    pub min_memory_mb: u64,
    /// Minimum free disk under the home directory in MB.
    #[serde(default = "default_min_disk_mb")]
    pub min_disk_mb: u64,
    /// Fail when `sudo` is not on PATH.
    #[serde(default)]
    pub require_sudo: bool,
}

impl Default for Checks {
    fn default() -> Self {
        Self {
            min_memory_mb: default_min_memory_mb(),
            min_disk_mb: default_min_disk_mb(),
            require_sudo: false,
        }
    }
}

const fn default_min_memory_mb() -> u64 {
    512
}

const fn default_min_disk_mb() -> u64 {
    1024
}

/// One `[[tools]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolEntry {
    /// Tool name for log lines and scratch-dir prefixes.
    pub name: String,
    /// Action that provisions the tool (shell string or argv array).
    pub install: Action,
    /// Command probed on PATH to detect presence.
    pub check: String,
    /// Optional filesystem probe (supports `~/` and `$XDG_CONFIG_HOME/`).
    #[serde(default)]
    pub path: Option<String>,
    /// Reinstall even when already present.
    #[serde(default)]
    pub force: bool,
    /// Total attempts for the install action (1 = no retry).
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Initial backoff delay between attempts, in seconds; doubles per retry.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Action registered on the rollback stack before installing.
    #[serde(default)]
    pub rollback: Option<Action>,
    /// Action registered in the cleanup registry before installing; runs on
    /// success and failure alike.
    #[serde(default)]
    pub cleanup: Option<Action>,
}

const fn default_retries() -> u32 {
    1
}

const fn default_retry_delay_secs() -> u64 {
    1
}

/// One `[[links]]` entry — either a plain source path or a structured
/// `{ source, target }` pair for an explicit target override.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LinkEntry {
    /// Plain string: `"zshrc"` — target is derived by convention.
    Simple(String),
    /// Structured: `{ source = "foo", target = "~/.bar" }` — explicit target.
    WithTarget {
        /// Relative path under the dotfiles root.
        source: String,
        /// Target path (supports `~/` and `$XDG_CONFIG_HOME/`).
        target: String,
    },
}

impl LinkEntry {
    /// The source path under the dotfiles root.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Simple(source) | Self::WithTarget { source, .. } => source,
        }
    }
}

/// Load and parse the manifest at `path`.
///
/// # Errors
///
/// Returns [`ManifestError::NotFound`] when the file is absent,
/// [`ManifestError::Io`] when it cannot be read, and [`ManifestError::Parse`]
/// when the TOML is invalid.
pub fn load(path: &Path) -> Result<Manifest> {
    if !path.exists() {
        return Err(ManifestError::NotFound(path.to_path_buf()).into());
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest = toml::from_str(&contents).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(manifest)
}

/// Expand a manifest path entry against the user's home directory.
///
/// `~/x` resolves under home, `$XDG_CONFIG_HOME/x` under the configuration
/// directory, absolute paths pass through, and anything else is
/// home-relative.
#[must_use]
pub fn expand_path(entry: &str, home: &Path) -> PathBuf {
    let xdg = std::env::var("XDG_CONFIG_HOME").ok();
    expand_path_with(entry, home, xdg.as_deref())
}

/// Pure form of [`expand_path`] with an explicit `XDG_CONFIG_HOME` value.
#[must_use]
pub fn expand_path_with(entry: &str, home: &Path, xdg_config_home: Option<&str>) -> PathBuf {
    if let Some(rest) = entry.strip_prefix("~/") {
        return home.join(rest);
    }
    if let Some(rest) = entry.strip_prefix("$XDG_CONFIG_HOME/") {
        return xdg_config_home
            .map_or_else(|| home.join(".config"), PathBuf::from)
            .join(rest);
    }
    let path = Path::new(entry);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(entry)
    }
}

/// Derive the conventional target for a link source without an explicit
/// target: the first component gains a dot prefix, so `zshrc` maps to
/// `$HOME/.zshrc` and `config/git` to `$HOME/.config/git`.
#[must_use]
pub fn derived_target(home: &Path, source: &str) -> PathBuf {
    home.join(format!(".{source}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
directories = ["~/.config", "~/.local/bin"]

[checks]
min_memory_mb = 256
min_disk_mb = 512
require_sudo = true

[[tools]]
name = "starship"
check = "starship"
path = "~/.local/bin/starship"
install = "curl -sS https://starship.rs/install.sh | sh -s -- -y"
retries = 3
retry_delay_secs = 2
rollback = { path = "~/.local/bin/starship" }

[[tools]]
name = "ripgrep"
check = "rg"
install = ["cargo", "install", "ripgrep"]

[[links]]
source = "zshrc"

[[links]]
source = "nvim"
target = "$XDG_CONFIG_HOME/nvim"
"#;

    #[test]
    fn parse_full_manifest() {
        let manifest: Manifest = toml::from_str(FULL).expect("manifest should parse");
        assert_eq!(manifest.directories.len(), 2);
        assert_eq!(manifest.checks.min_memory_mb, 256);
        assert!(manifest.checks.require_sudo);
        assert_eq!(manifest.tools.len(), 2);
        assert_eq!(manifest.links.len(), 2);
    }

    #[test]
    fn parse_tool_entry_fields() {
        let manifest: Manifest = toml::from_str(FULL).unwrap();
        let starship = &manifest.tools[0];
        assert_eq!(starship.name, "starship");
        assert_eq!(starship.retries, 3);
        assert_eq!(starship.retry_delay_secs, 2);
        assert!(starship.rollback.is_some());
        assert!(starship.cleanup.is_none());
        assert!(!starship.force);
    }

    #[test]
    fn parse_tool_argv_install() {
        let manifest: Manifest = toml::from_str(FULL).unwrap();
        assert_eq!(
            manifest.tools[1].install,
            Action::External(vec![
                "cargo".to_string(),
                "install".to_string(),
                "ripgrep".to_string()
            ])
        );
    }

    #[test]
    fn tool_defaults_apply() {
        let manifest: Manifest = toml::from_str(
            r#"
[[tools]]
name = "fzf"
check = "fzf"
install = "sudo apt-get install -y fzf"
"#,
        )
        .unwrap();
        let fzf = &manifest.tools[0];
        assert_eq!(fzf.retries, 1);
        assert_eq!(fzf.retry_delay_secs, 1);
        assert!(fzf.path.is_none());
    }

    #[test]
    fn parse_link_entries() {
        let manifest: Manifest = toml::from_str(FULL).unwrap();
        assert!(matches!(&manifest.links[0], LinkEntry::Simple(s) if s == "zshrc"));
        assert!(matches!(
            &manifest.links[1],
            LinkEntry::WithTarget { source, target }
                if source == "nvim" && target == "$XDG_CONFIG_HOME/nvim"
        ));
        assert_eq!(manifest.links[1].source(), "nvim");
    }

    #[test]
    fn empty_manifest_uses_defaults() {
        let manifest: Manifest = toml::from_str("").unwrap();
        assert!(manifest.directories.is_empty());
        assert!(manifest.tools.is_empty());
        assert!(manifest.links.is_empty());
        assert_eq!(manifest.checks.min_memory_mb, 512);
        assert_eq!(manifest.checks.min_disk_mb, 1024);
        assert!(!manifest.checks.require_sudo);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = toml::from_str::<Manifest>("unknown_key = 1\n");
        assert!(result.is_err(), "unknown top-level keys should fail parsing");
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("provision.toml")).unwrap_err();
        assert!(err.to_string().contains("Manifest not found"));
    }

    #[test]
    fn load_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provision.toml");
        std::fs::write(&path, "tools = not-valid").unwrap();
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid manifest"));
    }

    #[test]
    fn load_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provision.toml");
        std::fs::write(&path, FULL).unwrap();
        let manifest = load(&path).unwrap();
        assert_eq!(manifest.tools.len(), 2);
    }

    #[test]
    fn expand_tilde_entry() {
        let home = Path::new("/home/u");
        assert_eq!(
            expand_path_with("~/.local/bin", home, None),
            PathBuf::from("/home/u/.local/bin")
        );
    }

    #[test]
    fn expand_xdg_entry_with_env_value() {
        let home = Path::new("/home/u");
        assert_eq!(
            expand_path_with("$XDG_CONFIG_HOME/nvim", home, Some("/custom/config")),
            PathBuf::from("/custom/config/nvim")
        );
    }

    #[test]
    fn expand_xdg_entry_defaults_to_dot_config() {
        let home = Path::new("/home/u");
        assert_eq!(
            expand_path_with("$XDG_CONFIG_HOME/nvim", home, None),
            PathBuf::from("/home/u/.config/nvim")
        );
    }

    #[test]
    fn expand_absolute_entry_passes_through() {
        let home = Path::new("/home/u");
        assert_eq!(
            expand_path_with("/etc/something", home, None),
            PathBuf::from("/etc/something")
        );
    }

    #[test]
    fn expand_bare_entry_is_home_relative() {
        let home = Path::new("/home/u");
        assert_eq!(
            expand_path_with("workspace", home, None),
            PathBuf::from("/home/u/workspace")
        );
    }

    #[test]
    fn derived_target_for_flat_source() {
        assert_eq!(
            derived_target(Path::new("/home/u"), "zshrc"),
            PathBuf::from("/home/u/.zshrc")
        );
    }

    #[test]
    fn derived_target_for_nested_source() {
        assert_eq!(
            derived_target(Path::new("/home/u"), "config/git"),
            PathBuf::from("/home/u/.config/git")
        );
    }
}
