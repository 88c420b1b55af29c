//! Install command implementation.
use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::cli::{GlobalOpts, SelectionOpts};
use crate::engine::Mode;
use crate::logging::Logger;

/// Run the install command.
///
/// # Errors
///
/// Returns an error if configuration loading, selector parsing, or the
/// precondition gate fails, the run is aborted, or any component fails.
pub fn run(
    global: &GlobalOpts,
    opts: &SelectionOpts,
    log: &Arc<Logger>,
    interrupted: Arc<AtomicBool>,
) -> Result<()> {
    let version = option_env!("CYBEX_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.debug(&format!("cybex {version}"));
    if global.dry_run {
        log.info("dry run: nothing will be changed");
    }

    let setup = super::CommandSetup::init(global, log)?;
    let ctx = setup.context(global, Arc::clone(log), interrupted)?;
    super::run_selection(&setup, &opts.components, Mode::Install, &ctx, log)?;
    Ok(())
}
