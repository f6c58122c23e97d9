//! Provisioning context handed to handlers during BUILD.
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use super::{Mode, TaskList, TaskOpts};
use crate::assets::{AssetResolver, Transform};
use crate::config::MergedConfig;
use crate::error::{AssetError, BootError};
use crate::exec::Executor;
use crate::logging::Log;
use crate::operations::FileSystemOps;
use crate::template::TemplateRenderer;

/// Environment for the package install command.
const APT_ENV: &[(&str, &str)] = &[
    ("DEBIAN_FRONTEND", "noninteractive"),
    ("DEBIAN_PRIORITY", "critical"),
];

/// Description of the single package install task.
pub const INSTALL_PACKAGES: &str = "install packages";

/// System packages to install, shared between BUILD and the install task.
///
/// The install task reads the set when it runs, so packages required by
/// handlers processed after the task was registered are still installed.
#[derive(Debug, Clone, Default)]
pub struct PackageSet {
    names: Rc<RefCell<Vec<String>>>,
}

impl PackageSet {
    /// Add `name` unless already present.  Returns whether it was added.
    pub fn add(&self, name: &str) -> bool {
        let mut names = self.names.borrow_mut();
        if names.iter().any(|n| n == name) {
            return false;
        }
        names.push(name.to_string());
        true
    }

    /// Package names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.names.borrow().clone()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.borrow().is_empty()
    }

    /// The apt command line installing every package in the set.
    #[must_use]
    pub fn install_command(&self) -> String {
        format!(
            "apt-get update && apt-get upgrade -y && apt-get install -y {}",
            self.names().join(" ")
        )
    }
}

/// Shared state for compiling config sections into tasks.
///
/// Borrows the merged config, asset resolver and renderer for the duration
/// of BUILD and owns the [`TaskList`] being built.
pub struct Context<'a> {
    /// Override-resolved configuration.
    pub config: &'a MergedConfig,
    /// Layered asset lookup and staging.
    pub assets: &'a AssetResolver,
    /// Renderer for fetched templates.
    pub renderer: &'a TemplateRenderer,
    /// Command executor captured by task actions.
    pub executor: Arc<dyn Executor>,
    /// Filesystem operations captured by task actions.
    pub fs_ops: Arc<dyn FileSystemOps>,
    /// Logger for BUILD diagnostics.
    pub log: Arc<dyn Log>,
    /// Abort BUILD on asset transport errors instead of skipping.
    pub strict_fetch: bool,
    tasks: TaskList,
    packages: PackageSet,
    packages_scheduled: bool,
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &"<MergedConfig>")
            .field("assets", &self.assets.layers())
            .field("executor", &"<dyn Executor>")
            .field("fs_ops", &"<dyn FileSystemOps>")
            .field("strict_fetch", &self.strict_fetch)
            .field("tasks", &self.tasks.descriptions())
            .field("packages", &self.packages)
            .finish_non_exhaustive()
    }
}

impl<'a> Context<'a> {
    /// Create a context with an empty task list for `mode`.
    #[must_use]
    pub fn new(
        config: &'a MergedConfig,
        assets: &'a AssetResolver,
        renderer: &'a TemplateRenderer,
        executor: Arc<dyn Executor>,
        fs_ops: Arc<dyn FileSystemOps>,
        log: Arc<dyn Log>,
        mode: Mode,
    ) -> Self {
        Self {
            config,
            assets,
            renderer,
            executor,
            fs_ops,
            log,
            strict_fetch: false,
            tasks: TaskList::new(mode),
            packages: PackageSet::default(),
            packages_scheduled: false,
        }
    }

    /// Set whether asset transport errors abort BUILD.
    #[must_use]
    pub const fn with_strict_fetch(mut self, strict_fetch: bool) -> Self {
        self.strict_fetch = strict_fetch;
        self
    }

    /// Whether this is a first-boot run.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        self.tasks.mode().is_init()
    }

    /// Tasks registered so far.
    #[must_use]
    pub const fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    /// Finish BUILD, yielding the task list.
    #[must_use]
    pub fn into_tasks(self) -> TaskList {
        self.tasks
    }

    /// Packages queued for the install task.
    #[must_use]
    pub const fn packages(&self) -> &PackageSet {
        &self.packages
    }

    /// Append a task; init-only tasks are dropped in run mode.
    pub fn register(
        &mut self,
        description: impl Into<String>,
        opts: TaskOpts,
        action: impl FnOnce() -> Result<()> + 'static,
    ) -> bool {
        self.tasks.register(description, opts, action)
    }

    /// Append a task that runs on every boot.
    pub fn task(
        &mut self,
        description: impl Into<String>,
        action: impl FnOnce() -> Result<()> + 'static,
    ) {
        self.register(description, TaskOpts::default(), action);
    }

    /// Append a task that only runs on first boot.
    pub fn init_task(
        &mut self,
        description: impl Into<String>,
        action: impl FnOnce() -> Result<()> + 'static,
    ) {
        self.register(description, TaskOpts { init_only: true }, action);
    }

    /// Append a task running `command` through the shell.
    pub fn shell_task(&mut self, description: impl Into<String>, command: String) {
        let executor = Arc::clone(&self.executor);
        self.task(description, move || {
            executor.shell(&command, &[])?;
            Ok(())
        });
    }

    /// Fetch `path` through the layer chain and hand the staged file to
    /// `then`.
    ///
    /// A missing asset, or a transport failure when not in strict mode, is
    /// logged and `then` is not called, so no task is produced.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Transform`] or [`AssetError::Staging`] failures,
    /// transport failures in strict mode, and whatever `then` returns.
    pub fn fetch(
        &mut self,
        path: &str,
        transform: Transform<'_>,
        then: impl FnOnce(&mut Self, PathBuf) -> Result<(), BootError>,
    ) -> Result<(), BootError> {
        match self.assets.fetch(path, transform) {
            Ok(staged) => then(self, staged),
            Err(e @ AssetError::NotFound { .. }) => {
                self.log.error(&e.to_string());
                Ok(())
            }
            Err(e @ AssetError::Transport { .. }) if !self.strict_fetch => {
                self.log.error(&e.to_string());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch `path` unchanged.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub fn fetch_file(
        &mut self,
        path: &str,
        then: impl FnOnce(&mut Self, PathBuf) -> Result<(), BootError>,
    ) -> Result<(), BootError> {
        self.fetch(path, Transform::Identity, then)
    }

    /// Fetch `/templates/{name}` and render it.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub fn fetch_template(
        &mut self,
        name: &str,
        then: impl FnOnce(&mut Self, PathBuf) -> Result<(), BootError>,
    ) -> Result<(), BootError> {
        let renderer = self.renderer;
        self.fetch(&format!("/templates/{name}"), Transform::Render(renderer), then)
    }

    /// Fetch `/scripts/{name}`.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub fn fetch_script(
        &mut self,
        name: &str,
        then: impl FnOnce(&mut Self, PathBuf) -> Result<(), BootError>,
    ) -> Result<(), BootError> {
        self.fetch_file(&format!("/scripts/{name}"), then)
    }

    /// Fetch the `.deb` for package `name` built for the host architecture.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub fn fetch_package(
        &mut self,
        name: &str,
        then: impl FnOnce(&mut Self, PathBuf) -> Result<(), BootError>,
    ) -> Result<(), BootError> {
        let arch = self.renderer.facts().deb_arch().to_string();
        self.fetch_file(&format!("/packages/{name}_{arch}.deb"), then)
    }

    /// Queue `names` and schedule the install task if anything is queued.
    ///
    /// Used by the `packages` section; called once per BUILD.
    pub fn queue_packages(&mut self, names: &[String]) {
        for name in names {
            self.packages.add(name);
        }
        if !self.packages.is_empty() {
            self.schedule_package_install();
        }
    }

    /// Make sure `name` gets installed before any task registered after
    /// this call.
    ///
    /// Adds the package (deduplicated) and, if the install task does not
    /// exist yet, registers it at the current position.
    pub fn require_package(&mut self, name: &str) {
        if self.packages.add(name) {
            tracing::debug!("package {name} required");
        }
        self.schedule_package_install();
    }

    fn schedule_package_install(&mut self) {
        if self.packages_scheduled {
            return;
        }
        self.packages_scheduled = true;
        let executor = Arc::clone(&self.executor);
        let packages = self.packages.clone();
        self.task(INSTALL_PACKAGES, move || {
            executor.shell(&packages.install_command(), APT_ENV)?;
            Ok(())
        });
    }

    /// Schedule every script named by the `hook` value of `owner`.
    ///
    /// # Errors
    ///
    /// See [`scripts::run_scripts`](super::scripts::run_scripts).
    pub fn run_scripts(
        &mut self,
        owner: &str,
        hook: &str,
        value: Option<&Value>,
    ) -> Result<(), BootError> {
        super::scripts::run_scripts(self, owner, hook, value)
    }
}
