//! BUILD and EXECUTE: turns a loaded config stack into a run.
//!
//! [`Orchestrator::build`] consumes the orchestrator and yields a [`Plan`];
//! [`Plan::execute`] consumes the plan.  A plan cannot be built twice or
//! executed twice.
use std::sync::Arc;

use crate::assets::{AssetResolver, Staging, Transport};
use crate::config::{ConfigStack, MergedConfig, RESERVED_KEYS};
use crate::error::BootError;
use crate::exec::{Executor, SystemExecutor};
use crate::handlers::default_registry;
use crate::logging::Log;
use crate::operations::{FileSystemOps, SystemFileSystemOps};
use crate::platform::Facts;
use crate::tasks::{Context, Mode, Registry, TaskList};
use crate::template::TemplateRenderer;

/// Owner name used for the top-level hooks in error messages.
const GLOBAL: &str = "global";

/// Everything needed to compile a config stack into tasks.
#[derive(Debug)]
pub struct Orchestrator {
    stack: ConfigStack,
    transport: Box<dyn Transport>,
    staging: Staging,
    registry: Registry,
    renderer: TemplateRenderer,
    executor: Arc<dyn Executor>,
    fs_ops: Arc<dyn FileSystemOps>,
    log: Arc<dyn Log>,
    mode: Mode,
    strict_fetch: bool,
}

impl Orchestrator {
    /// Create an orchestrator with the built-in handlers, host facts,
    /// default staging and real command execution.
    #[must_use]
    pub fn new(
        stack: ConfigStack,
        transport: Box<dyn Transport>,
        log: Arc<dyn Log>,
        mode: Mode,
    ) -> Self {
        Self {
            stack,
            transport,
            staging: Staging::default(),
            registry: default_registry(),
            renderer: TemplateRenderer::new(Facts::detect()),
            executor: Arc::new(SystemExecutor),
            fs_ops: Arc::new(SystemFileSystemOps),
            log,
            mode,
            strict_fetch: false,
        }
    }

    /// Stage fetched assets into `staging`.
    #[must_use]
    pub fn with_staging(mut self, staging: Staging) -> Self {
        self.staging = staging;
        self
    }

    /// Replace the handler registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the template renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: TemplateRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replace the command executor captured by tasks.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Replace the filesystem operations captured by tasks.
    #[must_use]
    pub fn with_fs_ops(mut self, fs_ops: Arc<dyn FileSystemOps>) -> Self {
        self.fs_ops = fs_ops;
        self
    }

    /// Abort BUILD on asset transport errors instead of skipping them.
    #[must_use]
    pub const fn with_strict_fetch(mut self, strict_fetch: bool) -> Self {
        self.strict_fetch = strict_fetch;
        self
    }

    /// Compile the merged config into an ordered task list.
    ///
    /// Order: global `before`, every registered section in registry order,
    /// global `after`, then global `init` on first boot.  BUILD fetches and
    /// stages assets but never changes the target system.
    ///
    /// # Errors
    ///
    /// Returns the first handler, hook or fatal asset error.
    pub fn build(self) -> Result<Plan, BootError> {
        let config = self.stack.merged();
        for key in unknown_keys(&config, &self.registry) {
            self.log.warn(&format!("ignoring unknown config key '{key}'"));
        }

        let assets = AssetResolver::new(
            self.stack.base(),
            self.stack.names(),
            self.transport,
            self.staging,
        );
        let mut ctx = Context::new(
            &config,
            &assets,
            &self.renderer,
            self.executor,
            self.fs_ops,
            Arc::clone(&self.log),
            self.mode,
        )
        .with_strict_fetch(self.strict_fetch);

        ctx.run_scripts(GLOBAL, "before", config.get("before"))?;
        self.registry.process_all(&mut ctx)?;
        ctx.run_scripts(GLOBAL, "after", config.get("after"))?;
        if ctx.is_init() {
            ctx.run_scripts(GLOBAL, "init", config.get("init"))?;
        }

        Ok(Plan {
            tasks: ctx.into_tasks(),
            log: self.log,
        })
    }
}

/// Top-level keys that are neither registered sections nor reserved.
#[must_use]
pub fn unknown_keys<'a>(config: &'a MergedConfig, registry: &Registry) -> Vec<&'a str> {
    config
        .keys()
        .filter(|key| !registry.contains(key) && !RESERVED_KEYS.contains(key))
        .collect()
}

/// A built, not yet executed, task list.
#[derive(Debug)]
pub struct Plan {
    tasks: TaskList,
    log: Arc<dyn Log>,
}

impl Plan {
    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether BUILD produced no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task descriptions in execution order.
    #[must_use]
    pub fn descriptions(&self) -> Vec<&str> {
        self.tasks.descriptions()
    }

    /// Run every task in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`BootError::Task`] wrapping the failing task's
    /// [`TaskError::ExecutionFailed`](crate::error::TaskError::ExecutionFailed).
    pub fn execute(self) -> Result<(), BootError> {
        self.tasks.execute(self.log.as_ref())?;
        Ok(())
    }

    /// Log every task without running any.
    pub fn dry_run(self) {
        self.tasks.dry_run(self.log.as_ref());
    }
}
