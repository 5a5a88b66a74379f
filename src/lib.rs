//! Personal environment provisioning engine.
//!
//! Validates the host system, creates configuration directories, symlinks
//! dotfiles into place, and shell-calls external installers to provision
//! developer CLI tools — all driven by a declarative `provision.toml`
//! manifest at the root of a dotfiles checkout.
//!
//! The public API is organised into five layers:
//!
//! - **[`config`]** — parse and validate the TOML manifest
//! - **[`resources`]** — idempotent `check + apply` primitives (symlinks, directories, tools)
//! - **[`recovery`]** — run state, rollback/cleanup registries, retry helpers
//! - **[`steps`]** — named units of work executed strictly in sequence
//! - **[`commands`]** — top-level subcommand orchestration (`install`, `check`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod action;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod exec;
pub mod logging;
pub mod recovery;
pub mod resources;
pub mod steps;
pub mod system;
pub mod tempdir;
