//! Symlink resource with destructive target replacement.
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::error::LinkError;

/// A symlink into the dotfiles checkout.
///
/// Applying this resource is destructive by design: whatever currently
/// occupies `target` — regular file, directory tree, correct or broken
/// symlink — is removed before the link is created. No backup is taken.
/// Removal and creation are not atomic; a brief window where the target is
/// absent is an accepted limitation.
#[derive(Debug, Clone)]
pub struct SymlinkResource {
    /// The source file/directory inside the checkout (what the link points to).
    pub source: PathBuf,
    /// The target path (where the symlink will be created).
    pub target: PathBuf,
}

impl SymlinkResource {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }
}

impl Applicable for SymlinkResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.target.display(), self.source.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        if !self.source.exists() {
            return Err(LinkError::SourceMissing(self.source.clone()).into());
        }

        if let Some(parent) = self.target.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LinkError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // Remove whatever occupies the target, broken symlinks included.
        if self.target.symlink_metadata().is_ok() {
            remove_target(&self.target).map_err(|source| LinkError::RemoveTarget {
                path: self.target.clone(),
                source,
            })?;
        }

        create_symlink(&self.source, &self.target).map_err(|source| LinkError::CreateLink {
            path: self.target.clone(),
            source,
        })?;

        Ok(ResourceChange::Applied)
    }
}

impl Resource for SymlinkResource {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.source.exists() {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }

        std::fs::read_link(&self.target).map_or_else(
            |_| {
                // Target doesn't exist or isn't a symlink.
                if self.target.symlink_metadata().is_ok() {
                    let kind = if self.target.is_dir() {
                        "target is a directory"
                    } else {
                        "target is a regular file"
                    };
                    Ok(ResourceState::Incorrect {
                        current: kind.to_string(),
                    })
                } else {
                    Ok(ResourceState::Missing)
                }
            },
            |existing| {
                if existing == self.source {
                    Ok(ResourceState::Correct)
                } else {
                    Ok(ResourceState::Incorrect {
                        current: format!("points to {}", existing.display()),
                    })
                }
            },
        )
    }
}

/// Remove the current occupant of a target path, whatever its kind.
///
/// Directory symlinks must not be recursed into, so the entry kind is taken
/// from `symlink_metadata`, never from a following `stat`.
fn remove_target(path: &Path) -> std::io::Result<()> {
    let meta = std::fs::symlink_metadata(path)?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        // Covers regular files and symlinks, broken ones included.
        std::fs::remove_file(path)
    }
}

/// Create a symlink at `link` pointing to `target` (platform-specific).
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    {
        if target.is_dir() {
            std::os::windows::fs::symlink_dir(target, link)
        } else {
            std::os::windows::fs::symlink_file(target, link)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaffold() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let target = dir.path().join("target");
        std::fs::write(&source, "content").unwrap();
        (dir, source, target)
    }

    #[test]
    fn description_names_both_paths() {
        let resource =
            SymlinkResource::new(PathBuf::from("/dotfiles/nvim"), PathBuf::from("/home/u/.nvim"));
        assert!(resource.description().contains("/dotfiles/nvim"));
        assert!(resource.description().contains("/home/u/.nvim"));
    }

    #[test]
    fn state_invalid_when_source_missing() {
        let dir = tempfile::tempdir().unwrap();
        let resource = SymlinkResource::new(
            dir.path().join("nonexistent"),
            dir.path().join("target"),
        );
        let state = resource.current_state().unwrap();
        assert!(matches!(state, ResourceState::Invalid { .. }));
    }

    #[test]
    fn state_missing_when_target_absent() {
        let (_dir, source, target) = scaffold();
        let resource = SymlinkResource::new(source, target);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
    }

    #[test]
    fn state_incorrect_when_target_is_regular_file() {
        let (_dir, source, target) = scaffold();
        std::fs::write(&target, "other content").unwrap();
        let resource = SymlinkResource::new(source, target);
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Incorrect { .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn state_correct_when_link_points_to_source() {
        let (_dir, source, target) = scaffold();
        std::os::unix::fs::symlink(&source, &target).unwrap();
        let resource = SymlinkResource::new(source, target);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[cfg(unix)]
    #[test]
    fn state_incorrect_when_link_points_elsewhere() {
        let (dir, source, target) = scaffold();
        let other = dir.path().join("other");
        std::fs::write(&other, "x").unwrap();
        std::os::unix::fs::symlink(&other, &target).unwrap();
        let resource = SymlinkResource::new(source, target);
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Incorrect { .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn apply_creates_fresh_link() {
        let (_dir, source, target) = scaffold();
        let resource = SymlinkResource::new(source.clone(), target.clone());
        assert_eq!(resource.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(std::fs::read_link(&target).unwrap(), source);
    }

    /// A pre-existing regular file at the target is replaced
    /// by a symlink and no longer exists standalone.
    #[cfg(unix)]
    #[test]
    fn apply_replaces_regular_file() {
        let (_dir, source, target) = scaffold();
        std::fs::write(&target, "old standalone content").unwrap();

        let resource = SymlinkResource::new(source.clone(), target.clone());
        resource.apply().unwrap();

        let meta = std::fs::symlink_metadata(&target).unwrap();
        assert!(meta.is_symlink(), "target must now be a symlink");
        assert_eq!(std::fs::read_link(&target).unwrap(), source);
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "content",
            "reading through the link yields source content"
        );
    }

    #[cfg(unix)]
    #[test]
    fn apply_replaces_directory_tree() {
        let (_dir, source, target) = scaffold();
        std::fs::create_dir_all(target.join("nested")).unwrap();
        std::fs::write(target.join("nested/file"), "x").unwrap();

        let resource = SymlinkResource::new(source.clone(), target.clone());
        resource.apply().unwrap();

        let meta = std::fs::symlink_metadata(&target).unwrap();
        assert!(meta.is_symlink(), "directory target must be replaced");
        assert_eq!(std::fs::read_link(&target).unwrap(), source);
    }

    #[cfg(unix)]
    #[test]
    fn apply_replaces_wrong_symlink() {
        let (dir, source, target) = scaffold();
        let other = dir.path().join("other");
        std::fs::write(&other, "x").unwrap();
        std::os::unix::fs::symlink(&other, &target).unwrap();

        let resource = SymlinkResource::new(source.clone(), target.clone());
        resource.apply().unwrap();
        assert_eq!(std::fs::read_link(&target).unwrap(), source);
    }

    #[cfg(unix)]
    #[test]
    fn apply_replaces_broken_symlink() {
        let (dir, source, target) = scaffold();
        let gone = dir.path().join("gone");
        std::fs::write(&gone, "x").unwrap();
        std::os::unix::fs::symlink(&gone, &target).unwrap();
        std::fs::remove_file(&gone).unwrap();
        assert!(!target.exists(), "precondition: dangling link");

        let resource = SymlinkResource::new(source.clone(), target.clone());
        resource.apply().unwrap();
        assert_eq!(std::fs::read_link(&target).unwrap(), source);
    }

    #[test]
    fn apply_fails_when_source_missing() {
        let dir = tempfile::tempdir().unwrap();
        let resource = SymlinkResource::new(
            dir.path().join("nonexistent"),
            dir.path().join("target"),
        );
        let err = resource.apply().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[cfg(unix)]
    #[test]
    fn apply_creates_missing_parent_directories() {
        let (_dir, source, target) = scaffold();
        let deep_target = target.join("a/b/link");
        std::fs::create_dir(&target).unwrap();
        let resource = SymlinkResource::new(source.clone(), deep_target.clone());
        resource.apply().unwrap();
        assert_eq!(std::fs::read_link(&deep_target).unwrap(), source);
    }
}
