//! Host validation step.
use anyhow::Result;

use super::{Step, StepResult};
use crate::context::Context;
use crate::recovery::Recovery;
use crate::system;

/// Validate architecture, sudo, memory, and disk before any mutation.
pub struct ValidateSystem;

impl Step for ValidateSystem {
    fn name(&self) -> &str {
        "Validate system"
    }

    fn should_run(&self, _: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context, _: &mut Recovery) -> Result<StepResult> {
        let report = system::validate(
            ctx.executor.as_ref(),
            &ctx.config.manifest.checks,
            &ctx.home,
        )?;

        ctx.log.info(&format!("architecture: {}", report.arch));
        ctx.log.info(&format!(
            "sudo: {}",
            if report.sudo_available {
                "available"
            } else {
                "not found"
            }
        ));
        match report.memory_mb {
            Some(mb) => ctx.log.info(&format!("memory: {mb} MB")),
            None => ctx.log.debug("memory probe unavailable on this host"),
        }
        match report.disk_mb {
            Some(mb) => ctx.log.info(&format!("free disk: {mb} MB")),
            None => ctx.log.debug("disk probe unavailable on this host"),
        }

        Ok(StepResult::Ok)
    }
}
