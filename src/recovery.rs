//! Run-state tracking, rollback/cleanup registries, and retry helpers.
//!
//! The original trap-based handling is modelled as explicit state: errors
//! propagate up the call stack as `Result`s, SIGINT/SIGTERM only set a shared
//! flag, and the command layer performs rollback and cleanup from the
//! registries held here before exiting with the appropriate code.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;

use crate::action::Action;
use crate::exec::{ExecResult, Executor};
use crate::logging::Log;

/// Exit code a shell reports for a command that exists but is not executable.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// Exit code reported after an interrupt (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

/// Lifecycle state of one provisioning run.
///
/// `Running` transitions into exactly one of the three terminal states;
/// terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// The run is in progress.
    Running,
    /// The run finished with every step successful.
    Completed,
    /// A step failed and the run was aborted.
    Failed,
    /// SIGINT/SIGTERM ended the run early.
    Interrupted,
}

impl RunState {
    /// Process exit code for this state.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::Running | Self::Failed => 1,
            Self::Interrupted => EXIT_INTERRUPTED,
        }
    }

    /// Whether this is a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Rollback stack, cleanup registry, and run state for one invocation.
///
/// Rollback entries undo prior side effects and execute in
/// reverse-registration order on failure or interrupt; each entry runs at
/// most once because execution drains the stack. Cleanup entries release
/// resources regardless of outcome, in unspecified order, each independently
/// fault-tolerant.
#[derive(Debug)]
pub struct Recovery {
    state: RunState,
    started: chrono::DateTime<chrono::Utc>,
    error_count: u32,
    next_id: u64,
    rollbacks: Vec<(u64, Action)>,
    cleanups: Vec<(u64, Action)>,
    interrupted: Arc<AtomicBool>,
}

impl Recovery {
    /// Create a new recovery context sharing the given interrupt flag.
    #[must_use]
    pub fn new(interrupted: Arc<AtomicBool>) -> Self {
        Self {
            state: RunState::Running,
            started: chrono::Utc::now(),
            error_count: 0,
            next_id: 0,
            rollbacks: Vec::new(),
            cleanups: Vec::new(),
            interrupted,
        }
    }

    /// Install the process signal handler and return the shared flag.
    ///
    /// SIGINT and SIGTERM only set the flag; the step runner observes it
    /// between steps and triggers the `Interrupted` transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler cannot be installed (e.g., a handler
    /// was already registered by this process).
    pub fn install_interrupt_flag() -> Result<Arc<AtomicBool>> {
        let flag = Arc::new(AtomicBool::new(false));
        let handler_flag = Arc::clone(&flag);
        ctrlc::set_handler(move || {
            handler_flag.store(true, Ordering::SeqCst);
        })?;
        Ok(flag)
    }

    /// Current run state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Timestamp at which the run started.
    #[must_use]
    pub const fn started(&self) -> chrono::DateTime<chrono::Utc> {
        self.started
    }

    /// Number of errors recorded so far.
    #[must_use]
    pub const fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Whether an interrupt signal has been observed.
    #[must_use]
    pub fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Record one error against this run.
    pub const fn record_error(&mut self) {
        self.error_count += 1;
    }

    /// Register an action that undoes a side effect made so far.
    ///
    /// Returns the entry's id. Entries execute in reverse-registration order.
    pub fn register_rollback(&mut self, action: Action) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.rollbacks.push((id, action));
        id
    }

    /// Register an action that releases a resource regardless of outcome.
    pub fn register_cleanup(&mut self, action: Action) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.cleanups.push((id, action));
        id
    }

    /// Number of pending rollback entries.
    #[must_use]
    pub const fn pending_rollbacks(&self) -> usize {
        self.rollbacks.len()
    }

    /// Transition to `Completed`. No-op once a terminal state is reached.
    pub const fn complete(&mut self) {
        if !self.state.is_terminal() {
            self.state = RunState::Completed;
        }
    }

    /// Transition to `Failed`. No-op once a terminal state is reached.
    pub const fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = RunState::Failed;
        }
    }

    /// Transition to `Interrupted`. No-op once a terminal state is reached.
    pub const fn interrupt(&mut self) {
        if !self.state.is_terminal() {
            self.state = RunState::Interrupted;
        }
    }

    /// Execute the rollback stack in reverse-registration order.
    ///
    /// Each entry is removed before execution, so a second trigger re-runs
    /// nothing. A failing rollback is logged and never aborts the rest.
    pub fn unwind(&mut self, executor: &dyn Executor, log: &dyn Log) {
        if self.rollbacks.is_empty() {
            return;
        }
        log.warn(&format!(
            "rolling back {} operation(s)",
            self.rollbacks.len()
        ));
        while let Some((id, action)) = self.rollbacks.pop() {
            log.info(&format!("rollback #{id}: {}", action.describe()));
            match action.execute(executor) {
                Ok(result) if result.success => {}
                Ok(result) => log.warn(&format!(
                    "rollback #{id} exited {}",
                    result.code.unwrap_or(-1)
                )),
                Err(e) => log.warn(&format!("rollback #{id} failed: {e:#}")),
            }
        }
    }

    /// Execute and drain all cleanup entries.
    ///
    /// Runs on every exit path — success, failure, and interrupt. Each entry
    /// is independently fault-tolerant.
    pub fn run_cleanups(&mut self, executor: &dyn Executor, log: &dyn Log) {
        for (id, action) in self.cleanups.drain(..) {
            log.debug(&format!("cleanup #{id}: {}", action.describe()));
            match action.execute(executor) {
                Ok(result) if result.success => {}
                Ok(result) => log.warn(&format!(
                    "cleanup #{id} exited {}",
                    result.code.unwrap_or(-1)
                )),
                Err(e) => log.warn(&format!("cleanup #{id} failed: {e:#}")),
            }
        }
    }
}

/// Retry `op` with exponentially increasing delays.
///
/// Attempts `op` up to `max_attempts` times; after each failure it sleeps
/// `delay` and doubles it before the next attempt. Returns the first success
/// or the last error once attempts are exhausted.
///
/// # Errors
///
/// Returns the final attempt's error after exhaustion.
pub fn retry_with_backoff<T>(
    max_attempts: u32,
    initial_delay: Duration,
    log: &dyn Log,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T> {
    let attempts = max_attempts.max(1);
    let mut delay = initial_delay;
    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt == attempts => return Err(e),
            Err(e) => {
                log.warn(&format!(
                    "attempt {attempt}/{attempts} failed ({e:#}); retrying in {}s",
                    delay.as_secs_f64()
                ));
                std::thread::sleep(delay);
                delay *= 2;
            }
        }
    }
    unreachable!("loop returns on the final attempt")
}

/// Best-effort recovery for exit code 126 ("not executable").
///
/// Infers the target executable from the failed action — the first
/// whitespace token of a shell command, or `argv[0]` — marks it executable,
/// and re-runs the action once. The inference is a heuristic carried from
/// the original implementation: it can misidentify the target for complex
/// command lines, so recovery is only attempted when the token names an
/// existing file. Returns the successful re-run result, or `None` when
/// recovery does not apply or did not help.
pub fn recover_not_executable(
    action: &Action,
    executor: &dyn Executor,
    log: &dyn Log,
) -> Option<ExecResult> {
    let program = action.program()?;
    let path = Path::new(program);
    if !path.is_file() {
        log.debug(&format!(
            "permission recovery skipped: '{program}' is not an existing file"
        ));
        return None;
    }
    if !mark_executable(path) {
        return None;
    }
    log.warn(&format!("marked '{program}' executable; retrying once"));
    match action.execute(executor) {
        Ok(result) if result.success => Some(result),
        _ => None,
    }
}

/// Set the executable bits on `path`. Returns `false` when unsupported or on
/// error.
fn mark_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::metadata(path)
            .and_then(|meta| {
                let mut perms = meta.permissions();
                perms.set_mode(perms.mode() | 0o755);
                std::fs::set_permissions(path, perms)
            })
            .is_ok()
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        false
    }
}

/// Persist a copy of the run log to the user's home directory.
///
/// Called on any non-success exit; returns the destination path when the
/// copy succeeded.
pub fn persist_error_log(run_log: Option<&Path>, home: &Path) -> Option<PathBuf> {
    let src = run_log?;
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let dest = home.join(format!("provision_error_{stamp}.log"));
    std::fs::copy(src, &dest).ok()?;
    Some(dest)
}
