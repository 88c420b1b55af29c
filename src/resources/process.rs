//! Long-running helper processes and user-facing daemons.
use anyhow::Result;

use super::error::ResourceError;
use super::{Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// `pkill` exit status meaning "no process matched".
const PKILL_NO_MATCH: i32 = 1;

fn is_running(executor: &dyn Executor, binary: &str) -> Result<bool> {
    Ok(executor.run_unchecked("pgrep", &["-x", binary])?.success)
}

fn kill(executor: &dyn Executor, binary: &str) -> Result<bool> {
    let result = executor.run_unchecked("pkill", &["-x", binary])?;
    match result.code {
        Some(0) => Ok(true),
        Some(PKILL_NO_MATCH) => Ok(false),
        code => Err(ResourceError::external("pkill", &["-x", binary], code).into()),
    }
}

/// At most one instance of a helper process, started detached.
///
/// `remove` stops every instance; stopping a process that is not running is
/// a no-op.
#[derive(Debug)]
pub struct ProcessResource<'a> {
    binary: String,
    args: Vec<String>,
    executor: &'a dyn Executor,
}

impl<'a> ProcessResource<'a> {
    /// Create a new process resource.
    #[must_use]
    pub const fn new(binary: String, args: Vec<String>, executor: &'a dyn Executor) -> Self {
        Self {
            binary,
            args,
            executor,
        }
    }
}

impl Resource for ProcessResource<'_> {
    fn description(&self) -> String {
        format!("process {}", self.binary)
    }

    fn current_state(&self) -> Result<ResourceState> {
        if is_running(self.executor, &self.binary)? {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        if is_running(self.executor, &self.binary)? {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        self.executor.spawn_detached(&self.binary, &args)?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        if kill(self.executor, &self.binary)? {
            Ok(ResourceChange::Applied)
        } else {
            Ok(ResourceChange::AlreadyCorrect)
        }
    }
}

/// Restart of a user-facing daemon (status bar, shell) so it picks up
/// freshly deployed configuration.
///
/// Only needed when something earlier in the same component changed. A
/// graceful `helper` is preferred when it is on `PATH`; otherwise the daemon
/// is killed (tolerating "not running") and relaunched detached.
#[derive(Debug)]
pub struct DaemonRestart<'a> {
    name: String,
    args: Vec<String>,
    helper: Option<String>,
    pending: bool,
    executor: &'a dyn Executor,
}

impl<'a> DaemonRestart<'a> {
    /// Create a new restart resource. `pending` is whether the component
    /// changed anything before this action.
    #[must_use]
    pub const fn new(
        name: String,
        args: Vec<String>,
        helper: Option<String>,
        pending: bool,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            name,
            args,
            helper,
            pending,
            executor,
        }
    }
}

impl Resource for DaemonRestart<'_> {
    fn description(&self) -> String {
        format!("restart {}", self.name)
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.pending {
            Ok(ResourceState::Incorrect {
                current: "configuration changed".to_string(),
            })
        } else {
            Ok(ResourceState::Correct)
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        if !self.pending {
            return Ok(ResourceChange::AlreadyCorrect);
        }

        if let Some(helper) = self.helper.as_deref()
            && self.executor.which(helper)
        {
            let result = self.executor.run_interactive(helper, &[])?;
            if !result.success {
                return Err(ResourceError::external(helper, &[], result.code).into());
            }
            return Ok(ResourceChange::Applied);
        }

        if !kill(self.executor, &self.name)? {
            tracing::debug!("{} was not running", self.name);
        }
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        self.executor.spawn_detached(&self.name, &args)?;
        Ok(ResourceChange::Applied)
    }
}
