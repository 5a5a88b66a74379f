//! Tagged units of work for installation, rollback, and cleanup.
//!
//! The manifest expresses install/rollback/cleanup operations either as a
//! shell command line (string) or as an argv array; both deserialize into
//! [`Action`]. Structured variants keep failures inspectable and let
//! rollback entries be derived mechanically instead of string-matched.
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::exec::{ExecResult, Executor};

/// A single executable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Action {
    /// Run an argv vector directly, without shell interpretation.
    External(Vec<String>),
    /// Evaluate a command line through the platform shell.
    Shell(String),
    /// Remove a filesystem path (file, symlink, or directory tree).
    ///
    /// Removing a path that does not exist is a success; rollback and
    /// cleanup entries must tolerate being applied to work that never
    /// happened.
    RemovePath {
        /// The path to remove.
        path: PathBuf,
    },
}

impl Action {
    /// Human-readable description, used in log lines.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::External(argv) => argv.join(" "),
            Self::Shell(command) => command.clone(),
            Self::RemovePath { path } => format!("remove {}", path.display()),
        }
    }

    /// Best-effort guess at the executable this action runs.
    ///
    /// For a [`Action::Shell`] command this is the first whitespace-delimited
    /// token, which can misidentify the target for complex command lines
    /// (pipelines, env-var prefixes); callers must treat it as a heuristic,
    /// not a guarantee.
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        match self {
            Self::External(argv) => argv.first().map(String::as_str),
            Self::Shell(command) => command.split_whitespace().next(),
            Self::RemovePath { .. } => None,
        }
    }

    /// Execute this action with the process's current working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the action could not be started at all (the
    /// program is missing, or a filesystem operation failed). A command that
    /// runs but exits non-zero is reported through [`ExecResult::success`],
    /// not as an `Err`.
    pub fn execute(&self, executor: &dyn Executor) -> Result<ExecResult> {
        match self {
            Self::External(argv) => {
                let (program, args) = split_argv(argv)?;
                executor.run_unchecked(program, &args)
            }
            Self::Shell(command) => executor.shell_unchecked(command),
            Self::RemovePath { path } => remove_path(path),
        }
    }

    /// Execute this action with the child's working directory set to `dir`.
    ///
    /// The parent process never changes its own working directory; the
    /// switch is confined to the spawned command.
    ///
    /// # Errors
    ///
    /// Same contract as [`Action::execute`].
    pub fn execute_in(&self, executor: &dyn Executor, dir: &Path) -> Result<ExecResult> {
        match self {
            Self::External(argv) => {
                let (program, args) = split_argv(argv)?;
                executor.run_unchecked_in(dir, program, &args)
            }
            Self::Shell(command) => executor.shell_unchecked_in(dir, command),
            Self::RemovePath { path } => remove_path(path),
        }
    }
}

/// Split an argv vector into program and argument slices.
fn split_argv(argv: &[String]) -> Result<(&str, Vec<&str>)> {
    let (program, rest) = argv
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("empty argv in external action"))?;
    Ok((program.as_str(), rest.iter().map(String::as_str).collect()))
}

/// Remove a path of any kind, reporting success as a synthetic [`ExecResult`].
fn remove_path(path: &Path) -> Result<ExecResult> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        // Already gone: nothing to undo.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ok_result()),
        Err(e) => return Err(e.into()),
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        std::fs::remove_file(path)?;
    }
    Ok(ok_result())
}

const fn ok_result() -> ExecResult {
    ExecResult {
        stdout: String::new(),
        stderr: String::new(),
        success: true,
        code: Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::SystemExecutor;

    #[derive(Debug, Deserialize)]
    struct Holder {
        action: Action,
    }

    #[test]
    fn deserialize_string_as_shell() {
        let holder: Holder = toml::from_str(r#"action = "curl -sS https://example.com | sh""#)
            .expect("shell action should parse");
        assert_eq!(
            holder.action,
            Action::Shell("curl -sS https://example.com | sh".to_string())
        );
    }

    #[test]
    fn deserialize_array_as_external() {
        let holder: Holder =
            toml::from_str(r#"action = ["cargo", "install", "ripgrep"]"#).expect("argv parse");
        assert_eq!(
            holder.action,
            Action::External(vec![
                "cargo".to_string(),
                "install".to_string(),
                "ripgrep".to_string()
            ])
        );
    }

    #[test]
    fn describe_shell_returns_command_line() {
        let action = Action::Shell("echo hi".to_string());
        assert_eq!(action.describe(), "echo hi");
    }

    #[test]
    fn describe_remove_path_names_path() {
        let action = Action::RemovePath {
            path: PathBuf::from("/tmp/x"),
        };
        assert!(action.describe().contains("/tmp/x"));
    }

    #[test]
    fn program_of_shell_is_first_token() {
        let action = Action::Shell("curl -sS https://starship.rs | sh".to_string());
        assert_eq!(action.program(), Some("curl"));
    }

    #[test]
    fn program_of_external_is_argv_zero() {
        let action = Action::External(vec!["cargo".to_string(), "install".to_string()]);
        assert_eq!(action.program(), Some("cargo"));
    }

    #[test]
    fn program_of_remove_path_is_none() {
        let action = Action::RemovePath {
            path: PathBuf::from("/tmp/x"),
        };
        assert_eq!(action.program(), None);
    }

    /// The heuristic misidentifies env-var-prefixed commands; the test pins
    /// that known limitation so a change in behavior is deliberate.
    #[test]
    fn program_heuristic_is_naive_for_env_prefix() {
        let action = Action::Shell("FOO=1 ./install.sh".to_string());
        assert_eq!(action.program(), Some("FOO=1"));
    }

    #[test]
    fn execute_empty_external_fails() {
        let action = Action::External(vec![]);
        assert!(action.execute(&SystemExecutor).is_err());
    }

    #[test]
    fn remove_path_on_missing_path_succeeds() {
        let action = Action::RemovePath {
            path: PathBuf::from("/definitely/not/a/real/path/12345"),
        };
        let result = action.execute(&SystemExecutor).unwrap();
        assert!(result.success, "removing a missing path is a no-op success");
    }

    #[test]
    fn remove_path_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("victim.txt");
        std::fs::write(&file, "x").unwrap();
        let action = Action::RemovePath { path: file.clone() };
        action.execute(&SystemExecutor).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn remove_path_deletes_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("a/b");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("f"), "x").unwrap();
        let action = Action::RemovePath {
            path: dir.path().join("a"),
        };
        action.execute(&SystemExecutor).unwrap();
        assert!(!dir.path().join("a").exists());
    }

    #[cfg(unix)]
    #[test]
    fn execute_in_runs_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let action = Action::Shell("touch produced.txt".to_string());
        let result = action.execute_in(&SystemExecutor, dir.path()).unwrap();
        assert!(result.success);
        assert!(dir.path().join("produced.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn execute_external_captures_output() {
        let action = Action::External(vec!["echo".to_string(), "out".to_string()]);
        let result = action.execute(&SystemExecutor).unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.trim(), "out");
    }
}
