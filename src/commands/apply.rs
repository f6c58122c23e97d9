//! Commands: `run` and `init`, which load, build and execute a config.
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::assets::{Staging, transport_for};
use crate::cli::{ApplyOpts, GlobalOpts};
use crate::config::ConfigStack;
use crate::logging::{Log, Logger};
use crate::orchestrator::Orchestrator;
use crate::tasks::Mode;

/// Load the config at `opts.location`, build its tasks and run them.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded, BUILD fails or a task
/// fails.
pub fn run(global: &GlobalOpts, opts: &ApplyOpts, mode: Mode, log: &Arc<Logger>) -> Result<()> {
    log.info(&format!("kuzushi {} ({mode})", super::version::version()));

    log.stage("Loading configuration");
    let transport = transport_for(&opts.location);
    let stack = ConfigStack::load(transport.as_ref(), &opts.location)
        .with_context(|| format!("loading {}", opts.location))
        .map_err(|e| abort(log, e))?;
    log.info(&format!("layers: {}", stack.names().join(" -> ")));

    log.stage("Building tasks");
    let plan = Orchestrator::new(stack, transport, Arc::clone(log) as Arc<dyn Log>, mode)
        .with_staging(Staging::new(&global.staging_dir))
        .with_strict_fetch(global.strict_fetch)
        .build()
        .context("building tasks")
        .map_err(|e| abort(log, e))?;
    log.info(&format!("{} task(s) to run", plan.len()));

    if global.dry_run {
        plan.dry_run();
        log.print_summary();
        return Ok(());
    }

    let result = plan.execute();
    log.print_summary();
    result?;
    Ok(())
}

/// Record why the run stopped before any task ran.
fn abort(log: &Logger, err: anyhow::Error) -> anyhow::Error {
    log.error(&format!("{err:#}"));
    err
}
