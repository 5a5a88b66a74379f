//! Domain-specific error types for the provisioning engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`EnvironmentError`],
//! [`InstallError`]) while command handlers at the CLI boundary convert them
//! to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! ProvisionError
//! ├── Environment(EnvironmentError) — host validation (arch, memory, disk)
//! ├── Manifest(ManifestError)       — TOML manifest loading
//! ├── Install(InstallError)         — tool installation failures
//! └── Link(LinkError)               — symlink and directory operations
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the provisioning engine.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Host environment validation error (architecture, memory, disk, sudo).
    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// Manifest loading or parsing error.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Tool installation error.
    #[error("Install error: {0}")]
    Install(#[from] InstallError),

    /// Symlink or directory operation error.
    #[error("Link error: {0}")]
    Link(#[from] LinkError),
}

/// Errors that arise from host environment validation.
///
/// All of these are fatal and reported before any mutation is performed.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    /// The CPU architecture is not supported.
    #[error("Unsupported architecture '{0}': must be x86_64 or aarch64")]
    UnsupportedArchitecture(String),

    /// A command required for provisioning is not on PATH.
    #[error("Required command '{0}' not found on PATH")]
    MissingCommand(String),

    /// The host has less memory than the manifest requires.
    #[error("Insufficient memory: {available} MB available, {required} MB required")]
    InsufficientMemory {
        /// Memory detected on the host, in megabytes.
        available: u64,
        /// Minimum required by the manifest, in megabytes.
        required: u64,
    },

    /// The host has less free disk space than the manifest requires.
    #[error("Insufficient disk space: {available} MB available, {required} MB required")]
    InsufficientDisk {
        /// Free space detected under the home directory, in megabytes.
        available: u64,
        /// Minimum required by the manifest, in megabytes.
        required: u64,
    },

    /// An environment probe could not run at all.
    #[error("Environment probe failed: {0}")]
    ProbeFailed(String),
}

/// Errors that arise from manifest loading.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// No manifest file exists at the expected location.
    #[error("Manifest not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The manifest exists but contains invalid TOML.
    #[error("Invalid manifest {}: {source}", .path.display())]
    Parse {
        /// Path to the manifest that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// An I/O error occurred while reading the manifest.
    #[error("IO error reading manifest {}: {source}", .path.display())]
    Io {
        /// Path to the manifest that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise from tool installation.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The install action exited non-zero.
    #[error("Installation of '{tool}' failed (exit {code}): {detail}")]
    CommandFailed {
        /// Name of the tool that could not be installed.
        tool: String,
        /// Exit code reported by the install action.
        code: i32,
        /// Trimmed stderr (or stdout) from the install action.
        detail: String,
    },

    /// The install action could not be spawned at all.
    #[error("Installation of '{tool}' could not start")]
    Spawn {
        /// Name of the tool that could not be installed.
        tool: String,
        /// Underlying spawn error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Errors that arise from symlink and directory operations.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The symlink source does not exist under the dotfiles root.
    #[error("Link source does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    /// An existing target could not be removed before relinking.
    #[error("Cannot remove existing target {}: {source}", .path.display())]
    RemoveTarget {
        /// Target path that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The symlink itself could not be created.
    #[error("Cannot create link {}: {source}", .path.display())]
    CreateLink {
        /// Target path of the link that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A directory could not be created.
    #[error("Cannot create directory {}: {source}", .path.display())]
    CreateDirectory {
        /// Directory path that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
