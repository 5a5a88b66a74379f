//! Directory resource.
use std::path::PathBuf;

use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::error::LinkError;

/// A directory that must exist (parents included).
#[derive(Debug, Clone)]
pub struct DirectoryResource {
    /// Absolute path of the directory to create.
    pub path: PathBuf,
}

impl DirectoryResource {
    /// Create a new directory resource.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Applicable for DirectoryResource {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        if self.path.is_dir() {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        std::fs::create_dir_all(&self.path).map_err(|source| LinkError::CreateDirectory {
            path: self.path.clone(),
            source,
        })?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for DirectoryResource {
    fn current_state(&self) -> Result<ResourceState> {
        match self.path.symlink_metadata() {
            Ok(meta) if meta.is_dir() => Ok(ResourceState::Correct),
            Ok(_) => Ok(ResourceState::Invalid {
                reason: format!("exists but is not a directory: {}", self.path.display()),
            }),
            Err(_) => Ok(ResourceState::Missing),
        }
    }
}
