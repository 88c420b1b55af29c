//! Structured logger with dry-run awareness and the end-of-run summary.
use std::path::PathBuf;

use super::types::{ComponentOutcome, ComponentStatus, Log};
use super::utils::{DRY_RUN_TARGET, STAGE_TARGET, log_file_path};

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger backed by `tracing`.
///
/// All messages are also written to a persistent log file at
/// `$XDG_CACHE_HOME/cybex/<command>.log` (default `~/.cache/cybex/<command>.log`)
/// with timestamps and ANSI codes stripped, regardless of the verbose flag.
#[derive(Debug)]
pub struct Logger {
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary. The file
    /// itself is created by [`init_subscriber`](super::subscriber::init_subscriber).
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Print one line per component followed by the totals.
    pub fn print_summary(&self, outcomes: &[ComponentOutcome]) {
        if outcomes.is_empty() {
            return;
        }

        self.info("");
        self.stage("Summary");

        let mut applied = 0u32;
        let mut skipped = 0u32;
        let mut dry_run = 0u32;
        let mut failed = 0u32;

        for outcome in outcomes {
            let color = match outcome.status {
                ComponentStatus::Applied => {
                    applied += 1;
                    "\x1b[32m"
                }
                ComponentStatus::Skipped => {
                    skipped += 1;
                    "\x1b[2m"
                }
                ComponentStatus::DryRun => {
                    dry_run += 1;
                    "\x1b[37m"
                }
                ComponentStatus::Failed => {
                    failed += 1;
                    "\x1b[31m"
                }
            };

            let suffix = outcome
                .detail
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!(
                "{color}{} {}{suffix}\x1b[0m",
                outcome.status.icon(),
                outcome.name
            ));
        }

        self.info("");
        let total = applied + skipped + dry_run + failed;
        let mut totals = format!(
            "{total} components: \x1b[32m{applied} applied\x1b[0m, \x1b[2m{skipped} unchanged\x1b[0m"
        );
        if dry_run > 0 {
            totals.push_str(&format!(", \x1b[37m{dry_run} dry-run\x1b[0m"));
        }
        totals.push_str(&format!(", \x1b[31m{failed} failed\x1b[0m"));
        self.info(&totals);

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);
}
