//! Host system validation: architecture, sudo, memory, and disk checks.
use std::fmt;
use std::path::Path;

use anyhow::Result;

use crate::config::manifest::Checks;
use crate::error::EnvironmentError;
use crate::exec::Executor;

/// Supported CPU architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::X86_64 => write!(f, "x86_64"),
            Arch::Aarch64 => write!(f, "aarch64"),
        }
    }
}

/// Outcome of the host validation probes.
#[derive(Debug, Clone)]
pub struct SystemReport {
    pub arch: Arch,
    pub sudo_available: bool,
    /// Total memory in MB; `None` when the probe is unavailable on this host.
    pub memory_mb: Option<u64>,
    /// Free disk under the home directory in MB; `None` when unavailable.
    pub disk_mb: Option<u64>,
}

/// Validate the host against the manifest's `[checks]` thresholds.
///
/// Runs before any mutation; every failure here is fatal and leaves the
/// filesystem untouched. Probes that cannot run on this host (e.g., memory on
/// a non-Linux kernel) are skipped rather than failed.
///
/// # Errors
///
/// Returns an [`EnvironmentError`] for an unsupported architecture, a missing
/// required sudo, or thresholds the host does not meet.
pub fn validate(executor: &dyn Executor, checks: &Checks, home: &Path) -> Result<SystemReport> {
    let arch = check_architecture(executor)?;

    let sudo_available = executor.which("sudo");
    if checks.require_sudo && !sudo_available {
        return Err(EnvironmentError::MissingCommand("sudo".to_string()).into());
    }

    let memory_mb = total_memory_mb();
    if let Some(available) = memory_mb
        && available < checks.min_memory_mb
    {
        return Err(EnvironmentError::InsufficientMemory {
            available,
            required: checks.min_memory_mb,
        }
        .into());
    }

    let disk_mb = free_disk_mb(executor, home);
    if let Some(available) = disk_mb
        && available < checks.min_disk_mb
    {
        return Err(EnvironmentError::InsufficientDisk {
            available,
            required: checks.min_disk_mb,
        }
        .into());
    }

    Ok(SystemReport {
        arch,
        sudo_available,
        memory_mb,
        disk_mb,
    })
}

/// Probe the machine architecture via `uname -m`.
///
/// # Errors
///
/// Returns [`EnvironmentError::UnsupportedArchitecture`] for anything other
/// than x86_64/aarch64, or [`EnvironmentError::ProbeFailed`] if `uname`
/// cannot run.
pub fn check_architecture(executor: &dyn Executor) -> Result<Arch> {
    let result = executor
        .run_unchecked("uname", &["-m"])
        .map_err(|e| EnvironmentError::ProbeFailed(format!("uname -m: {e}")))?;
    if !result.success {
        return Err(EnvironmentError::ProbeFailed(format!(
            "uname -m exited {}",
            result.code.unwrap_or(-1)
        ))
        .into());
    }
    parse_arch(result.stdout.trim())
}

/// Map a `uname -m` machine string onto [`Arch`].
fn parse_arch(machine: &str) -> Result<Arch> {
    match machine {
        "x86_64" | "amd64" => Ok(Arch::X86_64),
        // macOS reports arm64 for Apple silicon.
        "aarch64" | "arm64" => Ok(Arch::Aarch64),
        other => Err(EnvironmentError::UnsupportedArchitecture(other.to_string()).into()),
    }
}

/// Total memory in MB from `/proc/meminfo`; `None` off Linux.
fn total_memory_mb() -> Option<u64> {
    if cfg!(target_os = "linux") {
        let contents = std::fs::read_to_string("/proc/meminfo").ok()?;
        parse_meminfo(&contents)
    } else {
        None
    }
}

/// Extract `MemTotal` (kB) from `/proc/meminfo` contents and convert to MB.
fn parse_meminfo(contents: &str) -> Option<u64> {
    contents
        .lines()
        .find(|line| line.starts_with("MemTotal:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb / 1024)
}

/// Free disk space in MB under `path`, probed via `df -Pk`.
fn free_disk_mb(executor: &dyn Executor, path: &Path) -> Option<u64> {
    let path_str = path.to_string_lossy();
    let result = executor.run_unchecked("df", &["-Pk", &path_str]).ok()?;
    if !result.success {
        return None;
    }
    parse_df_output(&result.stdout)
}

/// Extract the "Available" column (KB) from POSIX `df -Pk` output.
fn parse_df_output(stdout: &str) -> Option<u64> {
    stdout
        .lines()
        .nth(1)
        .and_then(|line| line.split_whitespace().nth(3))
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb / 1024)
}
