//! Installed-tool resource: probe for presence, install when absent.
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::action::Action;
use crate::error::InstallError;
use crate::exec::{ExecResult, Executor};
use crate::tempdir;

/// How the installer decided to treat a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallDecision {
    /// `force` was set; reinstall regardless of current state.
    ForcedReinstall,
    /// The configured path exists and is executable.
    PresentAtPath,
    /// The check command resolves on PATH.
    PresentOnPath,
    /// Not found anywhere; the install action must run.
    Install,
}

/// A provisionable tool.
///
/// The install action is an opaque unit of work — it is never parsed or
/// validated here, and partial side effects of a failed action are not rolled
/// back by this resource. Rollback actions are registered explicitly by the
/// caller.
pub struct ToolResource<'a> {
    /// Tool name, used for log lines and the scratch directory prefix.
    pub name: String,
    /// Action that provisions the tool.
    pub install: Action,
    /// Command probed on PATH to detect presence.
    pub check: String,
    /// Optional filesystem probe; when it exists and is executable the tool
    /// counts as installed without consulting PATH.
    pub check_path: Option<PathBuf>,
    /// Reinstall even when already present.
    pub force: bool,
    executor: &'a dyn Executor,
}

impl std::fmt::Debug for ToolResource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolResource")
            .field("name", &self.name)
            .field("install", &self.install)
            .field("check", &self.check)
            .field("check_path", &self.check_path)
            .field("force", &self.force)
            .finish_non_exhaustive()
    }
}

impl<'a> ToolResource<'a> {
    /// Create a new tool resource.
    #[must_use]
    pub const fn new(
        name: String,
        install: Action,
        check: String,
        check_path: Option<PathBuf>,
        force: bool,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            name,
            install,
            check,
            check_path,
            force,
            executor,
        }
    }

    /// Decide which branch of the install algorithm applies.
    ///
    /// Probe order: force flag, then the filesystem path, then PATH lookup.
    #[must_use]
    pub fn decide(&self) -> InstallDecision {
        if self.force {
            return InstallDecision::ForcedReinstall;
        }
        if let Some(path) = &self.check_path
            && is_executable(path)
        {
            return InstallDecision::PresentAtPath;
        }
        if self.executor.which(&self.check) {
            InstallDecision::PresentOnPath
        } else {
            InstallDecision::Install
        }
    }

    /// Run the install action once, inside a scoped scratch directory.
    ///
    /// # Errors
    ///
    /// Returns an error only when the action cannot be started; a non-zero
    /// exit is reported through the returned [`ExecResult`].
    pub fn run_install(&self) -> Result<ExecResult> {
        tempdir::run_in(&format!("provision_{}", self.name), self.executor, &self.install)
    }
}

/// Whether `path` exists and carries an executable bit.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

impl Applicable for ToolResource<'_> {
    fn description(&self) -> String {
        self.name.clone()
    }

    fn apply(&self) -> Result<ResourceChange> {
        match self.decide() {
            InstallDecision::PresentAtPath | InstallDecision::PresentOnPath => {
                Ok(ResourceChange::AlreadyCorrect)
            }
            InstallDecision::ForcedReinstall | InstallDecision::Install => {
                let result = self.run_install()?;
                if result.success {
                    Ok(ResourceChange::Applied)
                } else {
                    let detail = if result.stderr.trim().is_empty() {
                        result.stdout.trim().to_string()
                    } else {
                        result.stderr.trim().to_string()
                    };
                    Err(InstallError::CommandFailed {
                        tool: self.name.clone(),
                        code: result.code.unwrap_or(-1),
                        detail,
                    }
                    .into())
                }
            }
        }
    }
}

impl Resource for ToolResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let present = self
            .check_path
            .as_deref()
            .is_some_and(is_executable)
            || self.executor.which(&self.check);
        if present {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}
