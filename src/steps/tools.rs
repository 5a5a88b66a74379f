//! Tool installation step.
use std::time::Duration;

use anyhow::Result;

use super::{Step, StepResult};
use crate::config::manifest;
use crate::context::Context;
use crate::error::InstallError;
use crate::exec::ExecResult;
use crate::recovery::{self, EXIT_NOT_EXECUTABLE, Recovery};
use crate::resources::tool::{InstallDecision, ToolResource};

/// Ensure every configured tool is present, installing the absent ones.
///
/// Installation failures are fatal for the run. Per-tool rollback and
/// cleanup actions from the manifest are registered before the install
/// action runs, so a failure mid-install still unwinds them.
pub struct InstallTools;

impl Step for InstallTools {
    fn name(&self) -> &str {
        "Install tools"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.manifest.tools.is_empty()
    }

    fn run(&self, ctx: &Context, recovery: &mut Recovery) -> Result<StepResult> {
        let mut installed = 0u32;
        let mut already = 0u32;

        for entry in &ctx.config.manifest.tools {
            let check_path = entry
                .path
                .as_deref()
                .map(|p| manifest::expand_path(p, &ctx.home));
            let resource = ToolResource::new(
                entry.name.clone(),
                entry.install.clone(),
                entry.check.clone(),
                check_path,
                entry.force || ctx.force,
                ctx.executor.as_ref(),
            );

            match resource.decide() {
                InstallDecision::PresentAtPath => {
                    ctx.log.info(&format!(
                        "{}: already installed (found at configured path)",
                        entry.name
                    ));
                    already += 1;
                    continue;
                }
                InstallDecision::PresentOnPath => {
                    ctx.log
                        .info(&format!("{}: already installed", entry.name));
                    already += 1;
                    continue;
                }
                InstallDecision::ForcedReinstall => {
                    ctx.log
                        .info(&format!("{}: reinstalling (forced)", entry.name));
                }
                InstallDecision::Install => {
                    ctx.log
                        .info(&format!("{}: not found, installing", entry.name));
                }
            }

            if ctx.dry_run {
                ctx.log
                    .dry_run(&format!("would run: {}", entry.install.describe()));
                installed += 1;
                continue;
            }

            // Registered before the install runs, so a mid-install failure
            // still unwinds them.
            if let Some(cleanup) = &entry.cleanup {
                recovery.register_cleanup(cleanup.clone());
            }
            if let Some(rollback) = &entry.rollback {
                recovery.register_rollback(rollback.clone());
            }

            ctx.log.progress(&format!("installing {}", entry.name));
            let attempt = || -> Result<ExecResult> {
                let result = resource.run_install()?;
                if result.success {
                    return Ok(result);
                }
                if result.code == Some(EXIT_NOT_EXECUTABLE)
                    && let Some(recovered) = recovery::recover_not_executable(
                        &entry.install,
                        ctx.executor.as_ref(),
                        ctx.log.as_ref(),
                    )
                {
                    return Ok(recovered);
                }
                let detail = if result.stderr.trim().is_empty() {
                    result.stdout.trim().to_string()
                } else {
                    result.stderr.trim().to_string()
                };
                Err(InstallError::CommandFailed {
                    tool: entry.name.clone(),
                    code: result.code.unwrap_or(-1),
                    detail,
                }
                .into())
            };

            if entry.retries > 1 {
                recovery::retry_with_backoff(
                    entry.retries,
                    Duration::from_secs(entry.retry_delay_secs),
                    ctx.log.as_ref(),
                    attempt,
                )?;
            } else {
                attempt()?;
            }

            ctx.log.success(&format!("{} installed", entry.name));
            installed += 1;
        }

        if ctx.dry_run {
            ctx.log
                .info(&format!("{installed} would install, {already} already present"));
            return Ok(StepResult::DryRun);
        }

        ctx.log
            .info(&format!("{installed} installed, {already} already present"));
        Ok(StepResult::Ok)
    }
}
