//! One-shot shell commands, optionally run through `sudo`.
use anyhow::Result;

use super::error::ResourceError;
use super::{Resource, ResourceChange, ResourceState};
use crate::exec::{Executor, command_line};

/// An external command made idempotent by an optional `unless` probe.
///
/// When the probe exits zero the command is considered done and reported as
/// correct. Without a probe the command always runs.
#[derive(Debug)]
pub struct CommandResource<'a> {
    command: Vec<String>,
    unless: Option<Vec<String>>,
    privileged: bool,
    executor: &'a dyn Executor,
}

impl<'a> CommandResource<'a> {
    /// Create a new command resource.
    #[must_use]
    pub const fn new(
        command: Vec<String>,
        unless: Option<Vec<String>>,
        privileged: bool,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            command,
            unless,
            privileged,
            executor,
        }
    }

    /// Program and arguments as actually executed (with `sudo` prepended
    /// for privileged commands).
    #[must_use]
    pub fn argv(&self) -> Vec<&str> {
        let mut argv: Vec<&str> = Vec::with_capacity(self.command.len() + 1);
        if self.privileged {
            argv.push("sudo");
        }
        argv.extend(self.command.iter().map(String::as_str));
        argv
    }
}

impl Resource for CommandResource<'_> {
    fn description(&self) -> String {
        let argv = self.argv();
        argv.split_first()
            .map_or_else(String::new, |(program, args)| command_line(program, args))
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Some((program, args)) = self.unless.as_ref().and_then(|u| u.split_first()) else {
            return Ok(ResourceState::Missing);
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match self.executor.run_unchecked(program, &args) {
            Ok(result) if result.success => Ok(ResourceState::Correct),
            Ok(_) => Ok(ResourceState::Missing),
            // A probe that cannot start (e.g. the tool is not installed yet)
            // means the command still has to run.
            Err(e) => {
                tracing::debug!("unless probe for '{}' failed: {e:#}", self.description());
                Ok(ResourceState::Missing)
            }
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        let argv = self.argv();
        let Some((program, args)) = argv.split_first() else {
            return Err(ResourceError::InvalidState {
                resource: "command".to_string(),
                reason: "empty command".to_string(),
            }
            .into());
        };
        let result = self.executor.run_interactive(program, args)?;
        if !result.success {
            return Err(ResourceError::external(program, args, result.code).into());
        }
        Ok(ResourceChange::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resources::test_helpers::MockExecutor;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn privileged_command_runs_through_sudo() {
        let exec = MockExecutor::with_responses(vec![(true, "")]);
        let cmd = CommandResource::new(words("pacman -S --needed fish"), None, true, &exec);

        assert_eq!(cmd.description(), "sudo pacman -S --needed fish");
        assert_eq!(cmd.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(exec.calls(), vec!["sudo pacman -S --needed fish"]);
    }

    #[test]
    fn unprivileged_command_runs_directly() {
        let exec = MockExecutor::with_responses(vec![(true, "")]);
        let cmd = CommandResource::new(words("paru -S waycorner"), None, false, &exec);
        cmd.apply().unwrap();
        assert_eq!(exec.calls(), vec!["paru -S waycorner"]);
    }

    #[test]
    fn failing_command_reports_manual_rerun() {
        let exec = MockExecutor::with_responses(vec![(false, "")]);
        let cmd = CommandResource::new(words("pacman -S nope"), None, true, &exec);
        let err = cmd.apply().unwrap_err();
        assert!(
            err.to_string()
                .contains("re-run manually: sudo pacman -S nope"),
            "got: {err}"
        );
    }

    #[test]
    fn successful_unless_probe_means_correct() {
        let exec = MockExecutor::with_responses(vec![(true, "")]);
        let cmd = CommandResource::new(
            words("pacman -S fish"),
            Some(words("pacman -Q fish")),
            true,
            &exec,
        );
        assert_eq!(cmd.current_state().unwrap(), ResourceState::Correct);
        assert_eq!(exec.calls(), vec!["pacman -Q fish"]);
    }

    #[test]
    fn failing_unless_probe_means_missing() {
        let exec = MockExecutor::with_responses(vec![(false, "")]);
        let cmd = CommandResource::new(
            words("pacman -S fish"),
            Some(words("pacman -Q fish")),
            true,
            &exec,
        );
        assert_eq!(cmd.current_state().unwrap(), ResourceState::Missing);
    }

    #[test]
    fn without_probe_command_always_runs() {
        let exec = MockExecutor::default();
        let cmd = CommandResource::new(words("fc-cache -f"), None, false, &exec);
        assert_eq!(cmd.current_state().unwrap(), ResourceState::Missing);
        assert!(exec.calls().is_empty());
    }
}
