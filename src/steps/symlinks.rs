//! Symlink installation step.
use anyhow::{Result, bail};

use super::{Step, StepResult};
use crate::action::Action;
use crate::context::Context;
use crate::recovery::Recovery;
use crate::resources::symlink::SymlinkResource;
use crate::resources::{Applicable as _, Resource as _, ResourceState};

/// Link every configured dotfile into place.
///
/// Replacement is destructive: whatever occupies a target is removed first.
/// Every link this step creates gets a rollback entry, so an aborted run
/// removes the links it made (replaced originals are not restored — no
/// backups are taken).
pub struct InstallSymlinks;

impl Step for InstallSymlinks {
    fn name(&self) -> &str {
        "Install symlinks"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.manifest.links.is_empty()
    }

    fn run(&self, ctx: &Context, recovery: &mut Recovery) -> Result<StepResult> {
        let mut changed = 0u32;
        let mut already = 0u32;

        for (source, target) in ctx.config.link_pairs(&ctx.home) {
            let resource = SymlinkResource::new(source, target);
            match resource.current_state()? {
                ResourceState::Invalid { reason } => bail!("{reason}"),
                ResourceState::Correct => {
                    ctx.log
                        .debug(&format!("ok: {} (already linked)", resource.target.display()));
                    already += 1;
                }
                state => {
                    if ctx.dry_run {
                        ctx.log.dry_run(&format!(
                            "would link {} -> {}",
                            resource.target.display(),
                            resource.source.display()
                        ));
                        changed += 1;
                        continue;
                    }
                    if let ResourceState::Incorrect { current } = &state {
                        ctx.log.debug(&format!(
                            "replacing {} ({current})",
                            resource.target.display()
                        ));
                    }
                    resource.apply()?;
                    recovery.register_rollback(Action::RemovePath {
                        path: resource.target.clone(),
                    });
                    ctx.log.debug(&format!(
                        "linked {} -> {}",
                        resource.target.display(),
                        resource.source.display()
                    ));
                    changed += 1;
                }
            }
        }

        if ctx.dry_run {
            ctx.log
                .info(&format!("{changed} would change, {already} already ok"));
            return Ok(StepResult::DryRun);
        }

        ctx.log
            .info(&format!("{changed} changed, {already} already ok"));
        Ok(StepResult::Ok)
    }
}
