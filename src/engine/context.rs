//! Run-wide state shared by every action: paths, settings, and host seams.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::config::Config;
use crate::config::settings::Settings;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::Log;
use crate::platform::{Probe, SystemProbe};
use crate::prompt::{FixedPrompt, Prompt, TerminalPrompt};

/// Command-argument prefix that resolves into the payload directory.
pub const PAYLOAD_PREFIX: &str = "{payload}/";

/// Shared state for one engine invocation.
pub struct Context {
    /// Repository root (holds `conf/` and the payload directory).
    pub root: PathBuf,
    /// Invoking user's home directory; `~/` destinations expand against it.
    pub home: PathBuf,
    /// Directory that `deploy-file` sources are relative to.
    pub payload_dir: PathBuf,
    /// Gate and path tunables.
    pub settings: Settings,
    /// Logger for output.
    pub log: Arc<dyn Log>,
    /// Report what would change without mutating anything.
    pub dry_run: bool,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Host probes used by the precondition gate.
    pub probe: Arc<dyn Probe>,
    /// Confirmation source for `confirm = true` actions.
    pub prompt: Arc<dyn Prompt>,
    /// Raised by the Ctrl-C handler; checked between actions.
    pub interrupted: Arc<AtomicBool>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("root", &self.root)
            .field("home", &self.home)
            .field("payload_dir", &self.payload_dir)
            .field("settings", &self.settings)
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .field("executor", &self.executor)
            .field("probe", &"<dyn Probe>")
            .field("prompt", &self.prompt)
            .field("interrupted", &self.interrupted)
            .finish()
    }
}

impl Context {
    /// Creates a context wired to the real system.
    ///
    /// With `assume_yes`, every confirmation is answered "yes".
    ///
    /// # Errors
    ///
    /// Returns an error if the `HOME` environment variable is not set.
    pub fn new(config: &Config, log: Arc<dyn Log>, dry_run: bool, assume_yes: bool) -> Result<Self> {
        let home = std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .ok_or_else(|| anyhow::anyhow!("HOME environment variable is not set"))?;

        let prompt: Arc<dyn Prompt> = if assume_yes {
            Arc::new(FixedPrompt(true))
        } else {
            Arc::new(TerminalPrompt)
        };

        Ok(Self {
            root: config.root.clone(),
            home: PathBuf::from(home),
            payload_dir: config.payload_dir(),
            settings: config.settings.clone(),
            log,
            dry_run,
            executor: Arc::new(SystemExecutor),
            probe: Arc::new(SystemProbe),
            prompt,
            interrupted: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace the command executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Replace the host probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the confirmation source.
    #[must_use]
    pub fn with_prompt(mut self, prompt: Arc<dyn Prompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Replace the home directory.
    #[must_use]
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    /// Share an interrupt flag (normally the one given to the Ctrl-C handler).
    #[must_use]
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    /// Expand a leading `~/` against the home directory.
    #[must_use]
    pub fn expand(&self, path: &str) -> PathBuf {
        if path == "~" {
            return self.home.clone();
        }
        path.strip_prefix("~/")
            .map_or_else(|| PathBuf::from(path), |rest| self.home.join(rest))
    }

    /// Absolute path of a payload file.
    #[must_use]
    pub fn payload(&self, source: &Path) -> PathBuf {
        self.payload_dir.join(source)
    }

    /// Expand a command argument: a leading `~/` against the home directory
    /// and a leading `{payload}/` against the payload directory. Other
    /// arguments pass through untouched.
    #[must_use]
    pub fn expand_arg(&self, arg: &str) -> String {
        if let Some(rest) = arg.strip_prefix(PAYLOAD_PREFIX) {
            return self.payload_dir.join(rest).to_string_lossy().into_owned();
        }
        if arg == "~" || arg.starts_with("~/") {
            return self.expand(arg).to_string_lossy().into_owned();
        }
        arg.to_string()
    }

    /// [`Context::expand_arg`] over a whole argument vector.
    #[must_use]
    pub fn expand_args(&self, args: &[String]) -> Vec<String> {
        args.iter().map(|a| self.expand_arg(a)).collect()
    }

    /// Whether the operator asked to stop.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::test_context::context;
    use crate::resources::test_helpers::MockExecutor;
    use std::path::PathBuf;

    #[test]
    fn expands_tilde_against_home() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), MockExecutor::default());
        assert_eq!(
            ctx.expand("~/.config/fish/config.fish"),
            dir.path().join("home/.config/fish/config.fish")
        );
        assert_eq!(ctx.expand("~"), dir.path().join("home"));
        assert_eq!(ctx.expand("/etc/sudoers.d/cybex"), PathBuf::from("/etc/sudoers.d/cybex"));
    }

    #[test]
    fn payload_is_relative_to_payload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), MockExecutor::default());
        assert_eq!(
            ctx.payload(&PathBuf::from("fish/config.fish")),
            dir.path().join("payload/fish/config.fish")
        );
    }

    #[test]
    fn command_arguments_expand_home_and_payload() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), MockExecutor::default());
        let args: Vec<String> = ["-f", "~/.ssh/id_ed25519", "{payload}/sudo/nopasswd", "a~/b"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let home = dir.path().join("home/.ssh/id_ed25519");
        let payload = dir.path().join("payload/sudo/nopasswd");
        assert_eq!(
            ctx.expand_args(&args),
            vec![
                "-f".to_string(),
                home.to_string_lossy().into_owned(),
                payload.to_string_lossy().into_owned(),
                "a~/b".to_string(),
            ]
        );
    }

    #[test]
    fn interrupt_flag_is_shared() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), MockExecutor::default());
        assert!(!ctx.is_interrupted());
        crate::interrupt::signal(&ctx.interrupted);
        assert!(ctx.is_interrupted());
    }
}
