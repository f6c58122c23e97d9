//! Command-line interface definitions.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::assets::staging::DEFAULT_STAGING_DIR;
use crate::tasks::Mode;

/// Top-level CLI entry point for the node bootstrapping engine.
#[derive(Parser, Debug)]
#[command(
    name = "kuzushi",
    about = "Bootstrap a node from layered remote configuration",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Build and list tasks without running them
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Abort when an asset fetch fails for any reason other than "not found"
    #[arg(long, global = true)]
    pub strict_fetch: bool,

    /// Directory fetched assets are staged in
    #[arg(
        long,
        global = true,
        env = "KUZUSHI_STAGING_DIR",
        default_value = DEFAULT_STAGING_DIR
    )]
    pub staging_dir: PathBuf,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply the configuration (every boot)
    Run(ApplyOpts),
    /// Apply the configuration including first-boot tasks
    Init(ApplyOpts),
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Init(_) => "init",
            Self::Version => "version",
        }
    }

    /// Mode for the apply subcommands; `None` for `version`.
    #[must_use]
    pub const fn mode(&self) -> Option<Mode> {
        match self {
            Self::Run(_) => Some(Mode::Run),
            Self::Init(_) => Some(Mode::Init),
            Self::Version => None,
        }
    }
}

/// Options for the `run` and `init` subcommands.
#[derive(Parser, Debug, Clone)]
pub struct ApplyOpts {
    /// Config location: `<base>/<name>`, e.g. `https://cfg.example.com/nodes/web`
    pub location: String,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_with_location() {
        let cli = Cli::parse_from(["kuzushi", "run", "http://cfg/nodes/web"]);
        assert!(
            matches!(&cli.command, Command::Run(opts) if opts.location == "http://cfg/nodes/web")
        );
        assert_eq!(cli.command.mode(), Some(Mode::Run));
    }

    #[test]
    fn parse_init() {
        let cli = Cli::parse_from(["kuzushi", "init", "/srv/cfg/web"]);
        assert_eq!(cli.command.name(), "init");
        assert_eq!(cli.command.mode(), Some(Mode::Init));
    }

    #[test]
    fn location_is_required() {
        assert!(Cli::try_parse_from(["kuzushi", "run"]).is_err());
    }

    #[test]
    fn parse_dry_run_short() {
        let cli = Cli::parse_from(["kuzushi", "-d", "run", "http://cfg/web"]);
        assert!(cli.global.dry_run);
    }

    #[test]
    fn parse_strict_fetch() {
        let cli = Cli::parse_from(["kuzushi", "run", "--strict-fetch", "http://cfg/web"]);
        assert!(cli.global.strict_fetch);
    }

    #[test]
    fn parse_staging_dir_override() {
        let cli = Cli::parse_from(["kuzushi", "--staging-dir", "/run/kz", "init", "http://cfg/web"]);
        assert_eq!(cli.global.staging_dir, PathBuf::from("/run/kz"));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::parse_from(["kuzushi", "-v", "run", "http://cfg/web"]);
        assert!(cli.verbose);
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["kuzushi", "version"]);
        assert!(matches!(cli.command, Command::Version));
        assert_eq!(cli.command.mode(), None);
    }
}
