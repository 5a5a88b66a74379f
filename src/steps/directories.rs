//! Directory creation step.
use anyhow::{Result, bail};

use super::{Step, StepResult};
use crate::context::Context;
use crate::recovery::Recovery;
use crate::resources::directory::DirectoryResource;
use crate::resources::{Applicable as _, Resource as _, ResourceState};

/// Idempotently create every configured directory (and parents).
pub struct CreateDirectories;

impl Step for CreateDirectories {
    fn name(&self) -> &str {
        "Create directories"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.manifest.directories.is_empty()
    }

    fn run(&self, ctx: &Context, _: &mut Recovery) -> Result<StepResult> {
        let mut created = 0u32;
        let mut already = 0u32;

        for path in ctx.config.directory_paths(&ctx.home) {
            let resource = DirectoryResource::new(path);
            match resource.current_state()? {
                ResourceState::Correct => {
                    already += 1;
                }
                ResourceState::Invalid { reason } => bail!("{reason}"),
                _ => {
                    if ctx.dry_run {
                        ctx.log
                            .dry_run(&format!("would create {}", resource.description()));
                        created += 1;
                        continue;
                    }
                    resource.apply()?;
                    ctx.log.debug(&format!("created {}", resource.description()));
                    created += 1;
                }
            }
        }

        if ctx.dry_run {
            ctx.log
                .info(&format!("{created} would be created, {already} already present"));
            return Ok(StepResult::DryRun);
        }

        ctx.log
            .info(&format!("{created} created, {already} already present"));
        Ok(StepResult::Ok)
    }
}
