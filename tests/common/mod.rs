// Shared helpers for integration tests.
//
// Provides a temporary config tree served through `LocalTransport`, plus
// executor and filesystem doubles that record what tasks would do instead
// of touching the host.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use serde_json::Value;

use kuzushi::assets::transport::INDEX_FILE;
use kuzushi::assets::{LocalTransport, Staging};
use kuzushi::config::ConfigStack;
use kuzushi::exec::{ExecResult, Executor};
use kuzushi::logging::Logger;
use kuzushi::operations::FileSystemOps;
use kuzushi::orchestrator::{Orchestrator, Plan};
use kuzushi::platform::Facts;
use kuzushi::tasks::Mode;
use kuzushi::template::TemplateRenderer;

/// Executor double recording every command line it is asked to run.
///
/// Commands containing `fail_on` return an error after being recorded.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    commands: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl RecordingExecutor {
    /// An executor that fails any command containing `needle`.
    pub fn failing_on(needle: &str) -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            fail_on: Some(needle.to_string()),
        }
    }

    /// Commands recorded so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().expect("commands lock").clone()
    }

    fn record(&self, line: String) -> Result<ExecResult> {
        let failing = self.fail_on.as_ref().is_some_and(|n| line.contains(n.as_str()));
        self.commands.lock().expect("commands lock").push(line.clone());
        if failing {
            bail!("{line} failed (exit 1)");
        }
        Ok(ExecResult {
            stdout: String::new(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        })
    }
}

impl Executor for RecordingExecutor {
    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        _env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.record(line)
    }

    fn shell(&self, command: &str, env: &[(&str, &str)]) -> Result<ExecResult> {
        let mut line = String::new();
        for (k, v) in env {
            line.push_str(&format!("{k}={v} "));
        }
        line.push_str(command);
        self.record(line)
    }
}

/// Filesystem double: every path exists, copies and directories are recorded.
#[derive(Debug, Default)]
pub struct RecordingFs {
    copies: Mutex<Vec<(PathBuf, PathBuf)>>,
    dirs: Mutex<Vec<PathBuf>>,
}

impl RecordingFs {
    /// `(from, to)` pairs copied so far.
    pub fn copies(&self) -> Vec<(PathBuf, PathBuf)> {
        self.copies.lock().expect("copies lock").clone()
    }

    /// Directories created so far.
    pub fn dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().expect("dirs lock").clone()
    }
}

impl FileSystemOps for RecordingFs {
    fn exists(&self, _path: &Path) -> bool {
        true
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        self.copies
            .lock()
            .expect("copies lock")
            .push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.dirs.lock().expect("dirs lock").push(path.to_path_buf());
        Ok(())
    }
}

/// A config tree on disk: one directory per layer holding its
/// `index.json` document and its assets.
pub struct ConfigTree {
    /// Temporary directory holding `cfg/` and `stage/`.
    pub root: tempfile::TempDir,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(root.path().join("cfg")).expect("create cfg dir");
        Self { root }
    }

    /// Base location layer names are appended to.
    pub fn base(&self) -> PathBuf {
        self.root.path().join("cfg")
    }

    /// Location of layer `name`, as passed on the command line.
    pub fn location(&self, name: &str) -> String {
        self.base().join(name).to_string_lossy().to_string()
    }

    /// Staging directory used by [`orchestrator`](Self::orchestrator).
    pub fn staging_dir(&self) -> PathBuf {
        self.root.path().join("stage")
    }

    /// Write the document of layer `name`.
    pub fn layer(self, name: &str, doc: &Value) -> Self {
        let dir = self.base().join(name);
        std::fs::create_dir_all(&dir).expect("create layer dir");
        std::fs::write(dir.join(INDEX_FILE), doc.to_string()).expect("write layer document");
        self
    }

    /// Write an asset at `path` (e.g. `/files/zing.conf`) under layer `name`.
    pub fn asset(self, name: &str, path: &str, content: &str) -> Self {
        let file = self.base().join(name).join(path.trim_start_matches('/'));
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).expect("create asset parent");
        }
        std::fs::write(file, content).expect("write asset");
        self
    }

    /// Load the stack rooted at layer `name`.
    pub fn load(&self, name: &str) -> ConfigStack {
        ConfigStack::load(&LocalTransport, &self.location(name)).expect("load config stack")
    }

    /// An orchestrator over layer `name` wired to the given doubles.
    pub fn orchestrator(
        &self,
        name: &str,
        mode: Mode,
        executor: &Arc<RecordingExecutor>,
        fs: &Arc<RecordingFs>,
    ) -> Orchestrator {
        Orchestrator::new(
            self.load(name),
            Box::new(LocalTransport),
            Arc::new(Logger::new("test")),
            mode,
        )
        .with_staging(Staging::new(self.staging_dir()))
        .with_renderer(TemplateRenderer::new(
            Facts::default()
                .with("hostname", "node1")
                .with("deb_arch", "amd64"),
        ))
        .with_executor(Arc::clone(executor) as Arc<dyn Executor>)
        .with_fs_ops(Arc::clone(fs) as Arc<dyn FileSystemOps>)
    }

    /// Build the plan for layer `name`.
    pub fn build(
        &self,
        name: &str,
        mode: Mode,
        executor: &Arc<RecordingExecutor>,
        fs: &Arc<RecordingFs>,
    ) -> Plan {
        self.orchestrator(name, mode, executor, fs)
            .build()
            .expect("build plan")
    }
}
