//! Top-level subcommand implementations.
pub mod apply;
pub mod version;
