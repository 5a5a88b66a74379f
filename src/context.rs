//! Shared context for step execution.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::exec::Executor;
use crate::logging::Log;

/// Shared, read-only inputs for one provisioning run.
///
/// Mutable run state (rollback/cleanup registries, run status) lives in
/// [`Recovery`](crate::recovery::Recovery), passed `&mut` alongside this
/// context so the registries stay scoped to one logical run.
pub struct Context {
    /// Configuration loaded from the manifest.
    pub config: Config,
    /// Logger for output and step recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Whether to preview changes without applying.
    pub dry_run: bool,
    /// Reinstall tools even when already present.
    pub force: bool,
    /// User's home directory path.
    pub home: PathBuf,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("log", &"<dyn Log>")
            .field("executor", &"<dyn Executor>")
            .field("dry_run", &self.dry_run)
            .field("force", &self.force)
            .field("home", &self.home)
            .finish()
    }
}

impl Context {
    /// Creates a new context for step execution.
    ///
    /// # Errors
    ///
    /// Returns an error if the HOME (or USERPROFILE on Windows) environment
    /// variable is not set.
    pub fn new(
        config: Config,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        dry_run: bool,
        force: bool,
    ) -> Result<Self> {
        let home = if cfg!(target_os = "windows") {
            std::env::var("USERPROFILE")
                .or_else(|_| std::env::var("HOME"))
                .map_err(|_| {
                    anyhow::anyhow!("neither USERPROFILE nor HOME environment variable is set")
                })?
        } else {
            std::env::var("HOME")
                .map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?
        };

        Ok(Self {
            config,
            log,
            executor,
            dry_run,
            force,
            home: PathBuf::from(home),
        })
    }

    /// Root directory of the dotfiles checkout.
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.config.root
    }
}
