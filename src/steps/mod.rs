//! Named steps executed strictly in sequence by the install command.
pub mod directories;
pub mod symlinks;
pub mod system_check;
pub mod tools;

use anyhow::Result;

use crate::context::Context;
use crate::logging::StepStatus;
use crate::recovery::{Recovery, RunState};

/// Outcome of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// Step ran and applied (or verified) its changes.
    Ok,
    /// Step previewed its changes without applying them.
    DryRun,
    /// Step decided there was nothing to do.
    Skipped(String),
}

/// A named, executable step.
///
/// Steps run one at a time in declaration order; there is no dependency
/// graph and no parallelism. Each step receives the shared [`Context`] plus
/// the run's [`Recovery`] registries for rollback/cleanup registration.
pub trait Step {
    /// Human-readable step name.
    fn name(&self) -> &str;

    /// Whether this step has any work on the current configuration.
    fn should_run(&self, ctx: &Context) -> bool;

    /// Execute the step.
    ///
    /// # Errors
    ///
    /// Returns an error when the step cannot complete; the runner records the
    /// failure, transitions the run to `Failed`, and stops.
    fn run(&self, ctx: &Context, recovery: &mut Recovery) -> Result<StepResult>;
}

/// The complete, ordered step list for the install command.
#[must_use]
pub fn all_install_steps() -> Vec<Box<dyn Step>> {
    vec![
        Box::new(system_check::ValidateSystem),
        Box::new(directories::CreateDirectories),
        Box::new(symlinks::InstallSymlinks),
        Box::new(tools::InstallTools),
    ]
}

/// Run steps strictly in sequence until completion, failure, or interrupt.
///
/// The interrupt flag is observed between steps; a signal delivered during a
/// step takes effect once that step returns. On the first error the run
/// transitions to `Failed` and no further steps execute. The returned state
/// is always terminal.
pub fn run_steps(steps: &[&dyn Step], ctx: &Context, recovery: &mut Recovery) -> RunState {
    for step in steps {
        if recovery.interrupted() {
            ctx.log.warn("interrupt received; stopping");
            recovery.interrupt();
            break;
        }

        if !step.should_run(ctx) {
            ctx.log
                .debug(&format!("{}: nothing to do", step.name()));
            ctx.log
                .record_step(step.name(), StepStatus::Skipped, Some("nothing to do"));
            continue;
        }

        ctx.log.stage(step.name());
        match step.run(ctx, recovery) {
            Ok(StepResult::Ok) => ctx.log.record_step(step.name(), StepStatus::Ok, None),
            Ok(StepResult::DryRun) => ctx.log.record_step(step.name(), StepStatus::DryRun, None),
            Ok(StepResult::Skipped(reason)) => {
                ctx.log
                    .record_step(step.name(), StepStatus::Skipped, Some(&reason));
            }
            Err(e) => {
                ctx.log.error(&format!("{}: {e:#}", step.name()));
                ctx.log
                    .record_step(step.name(), StepStatus::Failed, Some(&e.to_string()));
                recovery.record_error();
                recovery.fail();
                break;
            }
        }
    }

    if recovery.state() == RunState::Running {
        if recovery.interrupted() {
            recovery.interrupt();
        } else {
            recovery.complete();
        }
    }
    recovery.state()
}
