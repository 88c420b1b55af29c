//! Subcommand orchestration shared by `install`, `uninstall`, and `list`.
pub mod install;
pub mod list;
pub mod uninstall;

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::engine::{self, Context, ExecutionReport, Mode};
use crate::error::CybexError;
use crate::gate::{self, Requirements};
use crate::logging::{ComponentStatus, Logger};
use crate::registry::Registry;

/// Environment variable naming the repository root.
pub const ROOT_ENV: &str = "CYBEX_ROOT";

/// Marker file identifying a repository root.
const COMPONENTS_FILE: &str = "conf/components.toml";

/// Loaded configuration and the validated registry built from it.
#[derive(Debug)]
pub struct CommandSetup {
    /// Configuration loaded from the repository root.
    pub config: Config,
    /// Registry built from `config` after its self-check passed.
    pub registry: Registry,
}

impl CommandSetup {
    /// Resolve the root, load configuration, and build the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be determined, a configuration
    /// file fails to load, or the registry self-check fails.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let root = resolve_root(global)?;
        log.debug(&format!("root: {}", root.display()));

        let config = Config::load(&root).map_err(CybexError::from)?;
        log.debug(&format!(
            "loaded {} components from {}",
            config.components.len(),
            root.join(COMPONENTS_FILE).display()
        ));

        let registry = Registry::new(config.components.clone(), config.categories.clone())
            .map_err(CybexError::from)?;
        Ok(Self { config, registry })
    }

    /// Build the engine context for this invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is unknown.
    pub fn context(
        &self,
        global: &GlobalOpts,
        log: Arc<Logger>,
        interrupted: Arc<AtomicBool>,
    ) -> Result<Context> {
        Ok(
            Context::new(&self.config, log, global.dry_run, global.yes)?
                .with_interrupt_flag(interrupted),
        )
    }
}

/// Select, gate, and run components, then report.
///
/// # Errors
///
/// Returns an error on a bad selector, a failed precondition, an abort, or
/// when any component failed.
pub fn run_selection(
    setup: &CommandSetup,
    selectors: &[String],
    mode: Mode,
    ctx: &Context,
    log: &Logger,
) -> Result<ExecutionReport> {
    let selected = setup
        .registry
        .select(selectors)
        .map_err(CybexError::from)?;
    log.info(&format!(
        "{} {}",
        mode.verb(),
        selected
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));

    let mut requirements = Requirements::collect(selected.iter().copied());
    if mode == Mode::Uninstall {
        requirements = requirements.privilege_only();
    }
    log.stage("Checking preconditions");
    gate::evaluate(&requirements, ctx).map_err(CybexError::from)?;

    let report = engine::run(&selected, mode, ctx);
    log.print_summary(&report.outcomes);

    if mode == Mode::Install && !ctx.dry_run {
        let reboot: Vec<&str> = selected
            .iter()
            .filter(|c| c.reboot)
            .filter(|c| report.status_of(&c.name) == Some(ComponentStatus::Applied))
            .map(|c| c.name.as_str())
            .collect();
        if !reboot.is_empty() {
            log.warn(&format!(
                "reboot required for changes to take effect: {}",
                reboot.join(", ")
            ));
        }
    }

    let partial = report.partially_applied();
    if !partial.is_empty() {
        log.warn(&format!(
            "partial changes may exist; inspect these components manually: {}",
            partial.join(", ")
        ));
    }

    if let Some(reason) = &report.aborted {
        anyhow::bail!("{} aborted: {reason}", mode.verb());
    }

    let count = report.failure_count();
    if count > 0 {
        anyhow::bail!("{count} component(s) failed");
    }
    Ok(report)
}

fn is_root(dir: &Path) -> bool {
    dir.join(COMPONENTS_FILE).is_file()
}

/// Resolve the repository root directory.
///
/// Order: `--root`, `CYBEX_ROOT`, the executable's location
/// (`target/release/` or `bin/`), then the current directory.
///
/// # Errors
///
/// Returns an error if no candidate holds `conf/components.toml`.
pub fn resolve_root(global: &GlobalOpts) -> Result<PathBuf> {
    if let Some(ref root) = global.root {
        return dunce::canonicalize(root)
            .with_context(|| format!("root directory {} does not exist", root.display()));
    }

    if let Some(root) = std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
        let root = PathBuf::from(root);
        return dunce::canonicalize(&root)
            .with_context(|| format!("{ROOT_ENV}={} does not exist", root.display()));
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(parent) = exe.parent()
    {
        let candidates = [
            parent.join("../.."), // target/release/ → repo root
            parent.join(".."),    // bin/ → repo root
        ];
        for candidate in &candidates {
            if is_root(candidate) {
                return Ok(dunce::canonicalize(candidate)?);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    if is_root(&cwd) {
        return Ok(cwd);
    }

    anyhow::bail!("cannot determine cybex root. Use --root or set {ROOT_ENV}")
}
