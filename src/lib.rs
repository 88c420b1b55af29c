//! Declarative, idempotent component configurator.
//!
//! Named components bundle file deployments, marker-delimited text edits,
//! commands, and service/process actions. `cybex install` brings them into
//! place and `cybex uninstall` reverts them, both safe to re-run.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: load `conf/components.toml` and `conf/settings.toml`
//! - **[`registry`]**: validate the component table and resolve selectors
//! - **[`gate`]**: privilege, disk, and network preconditions
//! - **[`resources`]**: idempotent `check + apply` primitives (files, text blocks, services, …)
//! - **[`engine`]**: run action lists in order and build the execution report
//! - **[`commands`]**: top-level subcommand orchestration (`install`, `uninstall`, `list`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod gate;
pub mod interrupt;
pub mod logging;
pub mod platform;
pub mod prompt;
pub mod registry;
pub mod resources;
