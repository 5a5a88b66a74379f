//! Configuration: the dotfiles root and its `provision.toml` manifest.
pub mod manifest;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use manifest::{LinkEntry, Manifest};

/// File name of the manifest at the dotfiles root.
pub const MANIFEST_FILE: &str = "provision.toml";

/// All loaded configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the dotfiles checkout.
    pub root: PathBuf,
    /// Parsed manifest.
    pub manifest: Manifest,
}

impl Config {
    /// Load the manifest from the given dotfiles root.
    ///
    /// # Errors
    ///
    /// Returns an error if the root does not exist or the manifest cannot be
    /// loaded.
    pub fn load(root: &Path) -> Result<Self> {
        let root = dunce::canonicalize(root)
            .with_context(|| format!("resolving dotfiles root {}", root.display()))?;
        let manifest = manifest::load(&root.join(MANIFEST_FILE))?;
        Ok(Self { root, manifest })
    }

    /// Resolved `(source, target)` pairs for every link entry.
    ///
    /// Sources are absolute paths under the root; targets come from the
    /// entry's explicit target (with `~/` and `$XDG_CONFIG_HOME/` expansion)
    /// or the dot-prefix convention.
    #[must_use]
    pub fn link_pairs(&self, home: &Path) -> Vec<(PathBuf, PathBuf)> {
        self.manifest
            .links
            .iter()
            .map(|entry| {
                let source = self.root.join(entry.source());
                let target = match entry {
                    LinkEntry::Simple(src) => manifest::derived_target(home, src),
                    LinkEntry::WithTarget { target, .. } => manifest::expand_path(target, home),
                };
                (source, target)
            })
            .collect()
    }

    /// Resolved absolute paths for every directory entry.
    #[must_use]
    pub fn directory_paths(&self, home: &Path) -> Vec<PathBuf> {
        self.manifest
            .directories
            .iter()
            .map(|entry| manifest::expand_path(entry, home))
            .collect()
    }
}

/// Resolve the dotfiles root directory.
///
/// Precedence: explicit `--root` flag, then the `DOTFILES_DIR` environment
/// variable, then probing relative to the running binary, then the current
/// directory.
///
/// # Errors
///
/// Returns an error if no candidate contains a manifest.
pub fn resolve_root(cli_root: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = cli_root {
        return Ok(root.to_path_buf());
    }

    if let Ok(root) = std::env::var("DOTFILES_DIR") {
        return Ok(PathBuf::from(root));
    }

    // Try to find the checkout from the current binary's location
    if let Ok(exe) = std::env::current_exe()
        && let Some(parent) = exe.parent()
    {
        // Check if we're in target/release/ or bin/
        let candidates = [
            parent.join("../.."), // target/release/ → checkout root
            parent.join(".."),    // bin/ → checkout root
        ];
        for candidate in &candidates {
            if candidate.join(MANIFEST_FILE).exists() {
                return Ok(dunce::canonicalize(candidate)?);
            }
        }
    }

    // Last resort: current directory
    let cwd = std::env::current_dir()?;
    if cwd.join(MANIFEST_FILE).exists() {
        return Ok(cwd);
    }

    anyhow::bail!("cannot determine dotfiles root. Use --root or set DOTFILES_DIR")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_root_uses_explicit_root() {
        let root = resolve_root(Some(Path::new("/explicit/path"))).unwrap();
        assert_eq!(root, PathBuf::from("/explicit/path"));
    }

    fn write_manifest(dir: &Path, contents: &str) {
        std::fs::write(dir.join(MANIFEST_FILE), contents).unwrap();
    }

    #[test]
    fn load_reads_manifest_from_root() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"
[[links]]
source = "zshrc"
"#,
        );
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.manifest.links.len(), 1);
    }

    #[test]
    fn load_fails_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Manifest not found"));
    }

    #[test]
    fn link_pairs_derive_dot_targets() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"
[[links]]
source = "zshrc"

[[links]]
source = "config/git"
"#,
        );
        let config = Config::load(dir.path()).unwrap();
        let home = Path::new("/home/u");
        let pairs = config.link_pairs(home);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, config.root.join("zshrc"));
        assert_eq!(pairs[0].1, PathBuf::from("/home/u/.zshrc"));
        assert_eq!(pairs[1].1, PathBuf::from("/home/u/.config/git"));
    }

    #[test]
    fn link_pairs_honor_explicit_targets() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"
[[links]]
source = "profile"
target = "~/.profile_custom"
"#,
        );
        let config = Config::load(dir.path()).unwrap();
        let pairs = config.link_pairs(Path::new("/home/u"));
        assert_eq!(pairs[0].1, PathBuf::from("/home/u/.profile_custom"));
    }

    #[test]
    fn directory_paths_expand_against_home() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), r#"directories = ["~/.local/bin", "workspace"]"#);
        let config = Config::load(dir.path()).unwrap();
        let dirs = config.directory_paths(Path::new("/home/u"));
        assert_eq!(dirs[0], PathBuf::from("/home/u/.local/bin"));
        assert_eq!(dirs[1], PathBuf::from("/home/u/workspace"));
    }
}
