//! The `install` command: validate, link, and provision in sequence.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, InstallOpts};
use crate::config::{self, Config};
use crate::context::Context;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger};
use crate::recovery::{self, Recovery, RunState};
use crate::steps::{self, Step};

/// Run the install command.
///
/// Returns the terminal run state; the caller maps it to the process exit
/// code (0 success, 1 failure, 130 interrupt). On a non-success state the
/// rollback stack is unwound, cleanups run, and a copy of the run log is
/// persisted to the home directory.
///
/// # Errors
///
/// Returns an error if configuration loading or context construction fails
/// before any step runs.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Arc<Logger>) -> Result<RunState> {
    let root = config::resolve_root(global.root.as_deref())?;

    let version = option_env!("PROVISION_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.info(&format!("provision {version}"));
    if let Ok(user) = std::env::var("USER") {
        log.debug(&format!("running as {user}"));
    }

    log.stage("Loading configuration");
    let cfg = Config::load(&root)?;
    log.info(&format!("root: {}", cfg.root.display()));
    log.info(&format!(
        "loaded {} tools, {} links, {} directories",
        cfg.manifest.tools.len(),
        cfg.manifest.links.len(),
        cfg.manifest.directories.len()
    ));

    let executor: Arc<dyn Executor> = Arc::new(SystemExecutor);
    let ctx = Context::new(
        cfg,
        Arc::clone(log) as Arc<dyn Log>,
        Arc::clone(&executor),
        global.dry_run,
        opts.force,
    )?;

    let interrupted = Recovery::install_interrupt_flag()?;
    let mut recovery = Recovery::new(interrupted);

    let all_steps = steps::all_install_steps();
    let selected = filter_steps(&all_steps, &opts.only, &opts.skip);

    let state = steps::run_steps(&selected, &ctx, &mut recovery);

    match state {
        RunState::Completed => {
            recovery.run_cleanups(executor.as_ref(), log.as_ref());
        }
        RunState::Failed | RunState::Interrupted => {
            recovery.unwind(executor.as_ref(), log.as_ref());
            recovery.run_cleanups(executor.as_ref(), log.as_ref());
            let run_log = log.log_path().map(std::path::PathBuf::as_path);
            if let Some(dest) = recovery::persist_error_log(run_log, &ctx.home) {
                log.error(&format!("details saved to {}", dest.display()));
            }
        }
        RunState::Running => {}
    }

    log.print_summary();
    Ok(state)
}

/// Filter the step list by the `--only` and `--skip` flags.
///
/// Matching is case-insensitive on step-name substrings; `--only` wins over
/// `--skip` when both are given.
fn filter_steps<'a>(
    all: &'a [Box<dyn Step>],
    only: &[String],
    skip: &[String],
) -> Vec<&'a dyn Step> {
    all.iter()
        .filter(|step| {
            let name = step.name().to_lowercase();
            if !only.is_empty() {
                return only.iter().any(|o| name.contains(&o.to_lowercase()));
            }
            if !skip.is_empty() {
                return !skip.iter().any(|s| name.contains(&s.to_lowercase()));
            }
            true
        })
        .map(|step| step.as_ref())
        .collect()
}
