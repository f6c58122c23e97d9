//! Deferred provisioning actions and the ordered list that holds them.
//!
//! BUILD appends [`Task`]s to a [`TaskList`]; EXECUTE runs them once, in
//! creation order, stopping at the first failure.
pub mod context;
pub mod dispatch;
pub mod scripts;

pub use context::{Context, PackageSet};
pub use dispatch::{Handler, Registry};

use std::fmt;

use anyhow::Result;

use crate::error::TaskError;
use crate::logging::{Log, TaskStatus};

/// Deferred, zero-argument unit of work.
pub type Action = Box<dyn FnOnce() -> Result<()>>;

/// Which boot this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Every boot: init-only tasks and `init` hooks are skipped.
    #[default]
    Run,
    /// First boot: everything runs.
    Init,
}

impl Mode {
    /// Whether init-only work should be scheduled.
    #[must_use]
    pub const fn is_init(self) -> bool {
        matches!(self, Self::Init)
    }

    /// Command name matching this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Init => "init",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options attached to a task at registration time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskOpts {
    /// Only runs on first boot.
    pub init_only: bool,
}

/// A described, deferred action.
pub struct Task {
    description: String,
    init_only: bool,
    action: Action,
}

impl Task {
    /// Create a task.
    #[must_use]
    pub fn new(description: impl Into<String>, opts: TaskOpts, action: Action) -> Self {
        Self {
            description: description.into(),
            init_only: opts.init_only,
            action,
        }
    }

    /// Human-readable description, e.g. `mount data`.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the task was registered as init-only.
    #[must_use]
    pub const fn is_init_only(&self) -> bool {
        self.init_only
    }

    /// Consume the task and run its action.
    ///
    /// # Errors
    ///
    /// Returns whatever the action returns.
    pub fn run(self) -> Result<()> {
        (self.action)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("description", &self.description)
            .field("init_only", &self.init_only)
            .finish_non_exhaustive()
    }
}

/// Append-only, ordered list of tasks for one run.
#[derive(Debug)]
pub struct TaskList {
    mode: Mode,
    tasks: Vec<Task>,
}

impl TaskList {
    /// Create an empty list for `mode`.
    #[must_use]
    pub const fn new(mode: Mode) -> Self {
        Self {
            mode,
            tasks: Vec::new(),
        }
    }

    /// The mode tasks are filtered by.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Append a task.
    ///
    /// Init-only tasks are dropped in run mode.  Returns whether the task
    /// was kept.
    pub fn register(
        &mut self,
        description: impl Into<String>,
        opts: TaskOpts,
        action: impl FnOnce() -> Result<()> + 'static,
    ) -> bool {
        let task = Task::new(description, opts, Box::new(action));
        if task.init_only && !self.mode.is_init() {
            tracing::debug!("skipping init-only task: {}", task.description);
            return false;
        }
        tracing::debug!("registered task: {}", task.description);
        self.tasks.push(task);
        true
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks have been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task descriptions in execution order.
    #[must_use]
    pub fn descriptions(&self) -> Vec<&str> {
        self.tasks.iter().map(Task::description).collect()
    }

    /// Consume the list into its tasks.
    #[must_use]
    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    /// Run every task in order, recording each outcome in `log`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::ExecutionFailed`] for the first task whose
    /// action fails; later tasks are recorded as not run.
    pub fn execute(self, log: &dyn Log) -> Result<(), TaskError> {
        let mut pending = self.tasks.into_iter();
        let mut failure = None;
        for task in pending.by_ref() {
            let description = task.description.clone();
            log.stage(&description);
            match task.run() {
                Ok(()) => log.record_task(&description, TaskStatus::Ok, None),
                Err(e) => {
                    let reason = format!("{e:#}");
                    log.error(&format!("{description}: {reason}"));
                    log.record_task(&description, TaskStatus::Failed, Some(&reason));
                    failure = Some(TaskError::ExecutionFailed {
                        task: description,
                        reason,
                    });
                    break;
                }
            }
        }
        match failure {
            Some(err) => {
                for rest in pending {
                    log.record_task(rest.description(), TaskStatus::NotRun, None);
                }
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// List every task without running it.
    pub fn dry_run(&self, log: &dyn Log) {
        for task in &self.tasks {
            log.dry_run(&task.description);
            log.record_task(&task.description, TaskStatus::DryRun, None);
        }
    }
}
