//! Ctrl-C handling.
//!
//! The first interrupt only raises a flag; the engine checks it between
//! actions and stops cleanly. A second interrupt exits at once with status
//! 130.
use anyhow::{Context as _, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exit status for a forced (second) interrupt.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Reason recorded in the execution report when the operator interrupts.
pub const INTERRUPTED: &str = "interrupted by operator";

/// Record one interrupt. Returns `true` if one was already pending.
pub fn signal(flag: &AtomicBool) -> bool {
    flag.swap(true, Ordering::SeqCst)
}

/// Install the process-wide Ctrl-C handler.
///
/// # Errors
///
/// Returns an error if a handler is already installed.
pub fn install_handler(flag: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        if signal(&flag) {
            tracing::warn!(
                "interrupted again; exiting now. Partial changes may exist; inspect the components listed above manually"
            );
            std::process::exit(FORCED_EXIT_CODE);
        }
        tracing::warn!("interrupt received; stopping after the current action (Ctrl-C again to force)");
    })
    .context("installing Ctrl-C handler")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_signal_reports_pending() {
        let flag = AtomicBool::new(false);
        assert!(!signal(&flag));
        assert!(flag.load(Ordering::SeqCst));
        assert!(signal(&flag));
    }
}
