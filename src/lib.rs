//! Declarative node bootstrapping engine.
//!
//! Fetches a layered JSON configuration from a remote store, compiles it
//! into an ordered list of provisioning tasks and runs them on the local
//! machine, either on first boot (`init`) or on every boot (`run`).
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: load and merge the `import` chain of config layers
//! - **[`assets`]**: fetch files, templates, scripts and packages across layers
//! - **[`tasks`]**: the task list, provisioning context and section dispatch
//! - **[`handlers`]**: built-in section handlers (packages, mounts, files, …)
//! - **[`orchestrator`]**: BUILD then EXECUTE
//! - **[`commands`]**: top-level subcommands (`run`, `init`, `version`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod assets;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod handlers;
pub mod logging;
pub mod operations;
pub mod orchestrator;
pub mod platform;
pub mod tasks;
pub mod template;
