//! Precondition gate: privilege, disk space, and connectivity checks run once
//! before any component mutates the machine.
use std::path::Path;

use crate::config::components::{Component, Requirement};
use crate::engine::Context;
use crate::error::PreconditionError;

/// Union of the requirements of a selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Requirements {
    /// Some component needs `sudo`.
    pub privilege: bool,
    /// Some component needs the network.
    pub network: bool,
    /// Largest free-space figure requested, in megabytes.
    pub disk_mb: Option<u64>,
}

impl Requirements {
    /// Merge the requirements of every component.
    #[must_use]
    pub fn collect<'a>(components: impl IntoIterator<Item = &'a Component>) -> Self {
        let mut req = Self::default();
        for requirement in components.into_iter().flat_map(|c| &c.requires) {
            match *requirement {
                Requirement::Privilege => req.privilege = true,
                Requirement::Network => req.network = true,
                Requirement::Disk { megabytes } => {
                    req.disk_mb = Some(req.disk_mb.map_or(megabytes, |mb| mb.max(megabytes)));
                }
            }
        }
        req
    }

    /// Keep only the privilege requirement (uninstall neither downloads nor
    /// grows the disk).
    #[must_use]
    pub const fn privilege_only(self) -> Self {
        Self {
            privilege: self.privilege,
            network: false,
            disk_mb: None,
        }
    }

    /// Whether nothing needs checking.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.privilege && !self.network && self.disk_mb.is_none()
    }
}

/// Check every requirement in the order privilege, disk, network.
///
/// # Errors
///
/// Returns the first failing [`PreconditionError`].
pub fn evaluate(req: &Requirements, ctx: &Context) -> Result<(), PreconditionError> {
    if req.is_empty() {
        ctx.log.debug("no preconditions to check");
        return Ok(());
    }
    if req.privilege {
        check_privilege(ctx)?;
    }
    if let Some(required_mb) = req.disk_mb {
        check_disk(required_mb, ctx)?;
    }
    if req.network {
        check_network(ctx)?;
    }
    Ok(())
}

fn check_privilege(ctx: &Context) -> Result<(), PreconditionError> {
    if ctx.probe.is_elevated() {
        return Err(PreconditionError::RunningAsRoot);
    }
    if !ctx.executor.which("sudo") {
        return Err(PreconditionError::SudoUnavailable);
    }
    if ctx.dry_run {
        ctx.log.dry_run("would validate sudo credentials: sudo -v");
        return Ok(());
    }

    ctx.log.debug("validating sudo credentials");
    let result = ctx
        .executor
        .run_interactive("sudo", &["-v"])
        .map_err(|e| PreconditionError::ProbeFailed {
            what: "sudo authorization".to_string(),
            reason: format!("{e:#}"),
        })?;
    if result.success {
        Ok(())
    } else {
        Err(PreconditionError::SudoUnauthorized {
            exit_code: result.code.unwrap_or(-1),
        })
    }
}

fn free_space(path: &Path, required_mb: u64, ctx: &Context) -> Result<(), PreconditionError> {
    let available_mb =
        ctx.probe
            .free_megabytes(path)
            .map_err(|e| PreconditionError::ProbeFailed {
                what: format!("free space on {}", path.display()),
                reason: format!("{e:#}"),
            })?;
    ctx.log.debug(&format!(
        "{}: {available_mb} MB free, {required_mb} MB required",
        path.display()
    ));
    if available_mb < required_mb {
        return Err(PreconditionError::InsufficientSpace {
            path: path.display().to_string(),
            required_mb,
            available_mb,
        });
    }
    Ok(())
}

fn check_disk(required_mb: u64, ctx: &Context) -> Result<(), PreconditionError> {
    free_space(&ctx.home, required_mb, ctx)?;

    let boot = &ctx.settings.paths.boot;
    if let Some(boot_dev) = ctx.probe.device_id(boot)
        && ctx.probe.device_id(&ctx.home) != Some(boot_dev)
    {
        free_space(boot, required_mb, ctx)?;
    }
    Ok(())
}

fn check_network(ctx: &Context) -> Result<(), PreconditionError> {
    let endpoints = &ctx.settings.network.endpoints;
    let Some(first) = endpoints.first() else {
        ctx.log
            .warn("network required but no endpoints are configured; skipping check");
        return Ok(());
    };

    let timeout = ctx.settings.network.timeout();
    for url in endpoints {
        if ctx.probe.reachable(url, timeout) {
            ctx.log.debug(&format!("network ok: {url}"));
            return Ok(());
        }
        ctx.log.debug(&format!("no response from {url}"));
    }

    Err(PreconditionError::NetworkUnreachable {
        endpoints: endpoints.join(", "),
        first: first.clone(),
    })
}
