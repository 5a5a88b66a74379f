//! The `check` command: host validation only, no mutation.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::{self, Config};
use crate::exec::SystemExecutor;
use crate::logging::Logger;
use crate::recovery::RunState;
use crate::system;

/// Run the check command.
///
/// Loads the manifest for its `[checks]` thresholds, validates the host, and
/// reports the findings. Nothing on the filesystem is touched.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the home
/// directory cannot be determined.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<RunState> {
    let root = config::resolve_root(global.root.as_deref())?;
    let cfg = Config::load(&root)?;

    let home = std::path::PathBuf::from(
        std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?,
    );

    log.stage("Validating system");
    match system::validate(&SystemExecutor, &cfg.manifest.checks, &home) {
        Ok(report) => {
            log.success(&format!("architecture: {}", report.arch));
            log.success(&format!(
                "sudo: {}",
                if report.sudo_available {
                    "available"
                } else {
                    "not found"
                }
            ));
            if let Some(mb) = report.memory_mb {
                log.success(&format!(
                    "memory: {mb} MB (minimum {})",
                    cfg.manifest.checks.min_memory_mb
                ));
            }
            if let Some(mb) = report.disk_mb {
                log.success(&format!(
                    "free disk: {mb} MB (minimum {})",
                    cfg.manifest.checks.min_disk_mb
                ));
            }
            log.info("system checks passed");
            Ok(RunState::Completed)
        }
        Err(e) => {
            log.error(&format!("{e:#}"));
            Ok(RunState::Failed)
        }
    }
}
