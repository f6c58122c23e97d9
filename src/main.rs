//! `kuzushi` command-line entry point.
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use kuzushi::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    match (&args.command, args.command.mode()) {
        (cli::Command::Run(opts) | cli::Command::Init(opts), Some(mode)) => {
            let command = args.command.name();
            logging::init_subscriber(args.verbose, command, &opts.location);
            let log = Arc::new(logging::Logger::new(command));
            commands::apply::run(&args.global, opts, mode, &log)
        }
        _ => {
            commands::version::run();
            Ok(())
        }
    }
}
