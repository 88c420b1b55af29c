// Shared helpers for integration tests.
//
// Provides a temporary repository root (conf/, payload/) next to a fake home
// directory, plus scripted stand-ins for the executor and the host probe so
// each test drives the real engine without touching the machine.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use cybex_cli::commands::CommandSetup;
use cybex_cli::config::Config;
use cybex_cli::config::settings::Settings;
use cybex_cli::engine::Context;
use cybex_cli::exec::{ExecResult, Executor, command_line};
use cybex_cli::logging::Logger;
use cybex_cli::platform::Probe;
use cybex_cli::prompt::FixedPrompt;
use cybex_cli::registry::Registry;

/// An isolated repository root and home directory backed by a
/// [`tempfile::TempDir`].
pub struct TestRepo {
    /// Holds `repo/` (conf and payload) and `home/`.
    pub dir: tempfile::TempDir,
}

impl TestRepo {
    /// Repository root.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("repo")
    }

    /// Fake home directory.
    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    /// Path under the fake home directory.
    pub fn home_path(&self, rel: &str) -> PathBuf {
        self.home().join(rel)
    }

    /// Overwrite a payload file.
    pub fn write_payload(&self, rel: &str, content: &str) {
        write(&self.root().join("payload").join(rel), content);
    }

    /// Load configuration and build the registry.
    pub fn setup(&self) -> CommandSetup {
        let config = Config::load(&self.root()).expect("load config");
        let registry = Registry::new(config.components.clone(), config.categories.clone())
            .expect("registry self-check");
        CommandSetup { config, registry }
    }

    /// Engine context using `executor` and `probe`; every confirmation is
    /// answered "yes".
    pub fn context(&self, executor: Arc<dyn Executor>, probe: Arc<dyn Probe>) -> Context {
        Context {
            root: self.root(),
            home: self.home(),
            payload_dir: self.root().join("payload"),
            settings: Settings::default(),
            log: Arc::new(Logger::new("test")),
            dry_run: false,
            executor,
            probe,
            prompt: Arc::new(FixedPrompt(true)),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Context with an executor that fails every call and a permissive probe.
    pub fn offline_context(&self) -> Context {
        self.context(Arc::new(FakeExecutor::default()), Arc::new(FakeProbe::default()))
    }

    /// Backups of the home file `rel`, oldest first.
    pub fn backups_of(&self, rel: &str) -> Vec<PathBuf> {
        cybex_cli::resources::backup::list_backups(&self.home_path(rel))
            .expect("list backups")
            .into_iter()
            .map(|(_, path)| path)
            .collect()
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, content).expect("write file");
}

/// Fluent builder for [`TestRepo`].
pub struct TestRepoBuilder {
    repo: TestRepo,
}

impl TestRepoBuilder {
    /// Begin with an empty component table.
    pub fn new() -> Self {
        let repo = TestRepo {
            dir: tempfile::tempdir().expect("create temp dir"),
        };
        std::fs::create_dir_all(repo.home()).expect("create home dir");
        std::fs::create_dir_all(repo.root().join("payload")).expect("create payload dir");
        write(&repo.root().join("conf/components.toml"), "");
        Self { repo }
    }

    /// Write `conf/components.toml`.
    pub fn with_components(self, toml: &str) -> Self {
        write(&self.repo.root().join("conf/components.toml"), toml);
        self
    }

    /// Write a payload file.
    pub fn with_payload(self, rel: &str, content: &str) -> Self {
        self.repo.write_payload(rel, content);
        self
    }

    /// Write a file under the fake home directory.
    pub fn with_home_file(self, rel: &str, content: &str) -> Self {
        write(&self.repo.home_path(rel), content);
        self
    }

    /// Finish building.
    pub fn build(self) -> TestRepo {
        self.repo
    }
}

/// Scripted [`Executor`]: answers come from a FIFO queue, every call is
/// recorded. An empty queue answers with a failure.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    responses: Mutex<VecDeque<bool>>,
    calls: Mutex<Vec<String>>,
}

impl FakeExecutor {
    /// Executor answering each call with the next entry of `responses`.
    pub fn with_responses(responses: &[bool]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().copied().collect()),
            calls: Mutex::default(),
        }
    }

    /// Every command line issued so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn next(&self, program: &str, args: &[&str]) -> ExecResult {
        self.calls
            .lock()
            .expect("calls lock")
            .push(command_line(program, args));
        let success = self
            .responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or(false);
        ExecResult {
            success,
            code: Some(i32::from(!success)),
            ..ExecResult::default()
        }
    }
}

impl Executor for FakeExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let result = self.next(program, args);
        if !result.success {
            anyhow::bail!("{} failed", command_line(program, args));
        }
        Ok(result)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        Ok(self.next(program, args))
    }

    fn run_interactive(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        Ok(self.next(program, args))
    }

    fn spawn_detached(&self, program: &str, args: &[&str]) -> Result<()> {
        self.run(program, args).map(|_| ())
    }

    fn which(&self, _program: &str) -> bool {
        true
    }
}

/// Fixed answers for the precondition gate.
#[derive(Debug, Clone, Copy)]
pub struct FakeProbe {
    /// Answer to `is_elevated`.
    pub elevated: bool,
    /// Free space reported for every path.
    pub free_mb: u64,
    /// Whether every endpoint is reachable.
    pub online: bool,
}

impl Default for FakeProbe {
    fn default() -> Self {
        Self {
            elevated: false,
            free_mb: 100_000,
            online: true,
        }
    }
}

impl Probe for FakeProbe {
    fn is_elevated(&self) -> bool {
        self.elevated
    }

    fn free_megabytes(&self, _path: &Path) -> Result<u64> {
        Ok(self.free_mb)
    }

    fn device_id(&self, _path: &Path) -> Option<u64> {
        Some(1)
    }

    fn reachable(&self, _url: &str, _timeout: Duration) -> bool {
        self.online
    }
}

/// Sleep past the current second so the next backup gets its own timestamp.
pub fn wait_for_next_second() {
    std::thread::sleep(Duration::from_millis(1100));
}
