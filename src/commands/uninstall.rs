//! Uninstall command implementation.
use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::cli::{GlobalOpts, SelectionOpts};
use crate::engine::Mode;
use crate::logging::Logger;

/// Run the uninstall command.
///
/// Files are only restored or removed while they still hold the bundled
/// payload; anything edited since install is left alone.
///
/// # Errors
///
/// Returns an error if configuration loading, selector parsing, or the
/// privilege check fails, the run is aborted, or any component fails.
pub fn run(
    global: &GlobalOpts,
    opts: &SelectionOpts,
    log: &Arc<Logger>,
    interrupted: Arc<AtomicBool>,
) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let ctx = setup.context(global, Arc::clone(log), interrupted)?;
    super::run_selection(&setup, &opts.components, Mode::Uninstall, &ctx, log)?;
    Ok(())
}
