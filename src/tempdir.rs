//! Scoped scratch directories with guaranteed removal.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::action::Action;
use crate::exec::{ExecResult, Executor};

/// A uniquely named scratch directory removed on scope exit.
///
/// The directory is created under the OS temp root with a
/// `<prefix>_<timestamp>_<random>` name. Removal happens exactly once: either
/// through [`ScopedTempDir::cleanup`] or, failing that, through `Drop` —
/// including the unwind path when the owning operation errors out. A removal
/// failure is logged as a warning and is never fatal.
#[derive(Debug)]
pub struct ScopedTempDir {
    path: PathBuf,
    cleaned: bool,
}

impl ScopedTempDir {
    /// Create a new scratch directory under the OS temp root.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying directory creation fails.
    pub fn create(prefix: &str) -> Result<Self> {
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let dir = tempfile::Builder::new()
            .prefix(&format!("{prefix}_{stamp}_"))
            .tempdir()
            .with_context(|| format!("creating scratch directory for '{prefix}'"))?;
        Ok(Self {
            // Ownership of removal moves to this handle.
            path: dir.keep(),
            cleaned: false,
        })
    }

    /// The scratch directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now instead of waiting for `Drop`.
    pub fn cleanup(mut self) {
        self.remove_best_effort();
    }

    fn remove_best_effort(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        if !self.path.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            tracing::warn!(
                "failed to remove scratch directory {}: {e}",
                self.path.display()
            );
        }
    }
}

impl Drop for ScopedTempDir {
    fn drop(&mut self) {
        self.remove_best_effort();
    }
}

/// Execute `action` with its working directory pointed at a fresh scratch
/// directory, removing the directory on every exit path.
///
/// The switch is confined to the spawned command — the calling process never
/// changes its own working directory.
///
/// # Errors
///
/// Returns an error if the scratch directory cannot be created or the action
/// cannot be started. A command that runs but exits non-zero is reported
/// through [`ExecResult::success`].
pub fn run_in(prefix: &str, executor: &dyn Executor, action: &Action) -> Result<ExecResult> {
    let dir = ScopedTempDir::create(prefix)?;
    let result = action.execute_in(executor, dir.path());
    dir.cleanup();
    result
}
