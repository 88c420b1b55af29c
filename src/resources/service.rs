//! systemd unit state reconciliation.
use anyhow::Result;
use serde::Deserialize;

use super::error::ResourceError;
use super::{Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Which systemd instance manages the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceScope {
    /// The per-user manager (`systemctl --user`).
    #[default]
    User,
    /// The system manager; mutations go through `sudo`.
    System,
}

/// Desired state of a systemd unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DesiredService {
    /// Whether the unit should be enabled; `None` leaves it as is.
    pub enabled: Option<bool>,
    /// Whether the unit should be running; `None` leaves it as is.
    pub active: Option<bool>,
    /// Restart a unit that is already running and should stay running.
    pub restart: bool,
}

/// A systemd unit brought to a [`DesiredService`] state.
///
/// Only the aspects that differ from the desired state are touched.
#[derive(Debug)]
pub struct ServiceResource<'a> {
    service: String,
    scope: ServiceScope,
    desired: DesiredService,
    executor: &'a dyn Executor,
}

#[derive(Debug, Clone, Copy)]
struct Observed {
    enabled: bool,
    active: bool,
}

impl<'a> ServiceResource<'a> {
    /// Create a new service resource.
    #[must_use]
    pub const fn new(
        service: String,
        scope: ServiceScope,
        desired: DesiredService,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            service,
            scope,
            desired,
            executor,
        }
    }

    fn query(&self, verb: &str) -> Result<bool> {
        let result = match self.scope {
            ServiceScope::User => self
                .executor
                .run_unchecked("systemctl", &["--user", verb, self.service.as_str()])?,
            ServiceScope::System => self
                .executor
                .run_unchecked("systemctl", &[verb, self.service.as_str()])?,
        };
        Ok(result.success)
    }

    fn observe(&self) -> Result<Observed> {
        Ok(Observed {
            enabled: self.query("is-enabled")?,
            active: self.query("is-active")?,
        })
    }

    fn systemctl(&self, verb: &str) -> Result<()> {
        let (program, args): (&str, Vec<&str>) = match self.scope {
            ServiceScope::User => ("systemctl", vec!["--user", verb, self.service.as_str()]),
            ServiceScope::System => ("sudo", vec!["systemctl", verb, self.service.as_str()]),
        };
        let result = self.executor.run_interactive(program, &args)?;
        if !result.success {
            return Err(ResourceError::external(program, &args, result.code).into());
        }
        Ok(())
    }

    fn differences(&self, observed: Observed) -> Vec<&'static str> {
        let mut diffs = Vec::new();
        if let Some(want) = self.desired.enabled
            && want != observed.enabled
        {
            diffs.push(if observed.enabled { "enabled" } else { "disabled" });
        }
        if let Some(want) = self.desired.active
            && want != observed.active
        {
            diffs.push(if observed.active { "active" } else { "inactive" });
        }
        diffs
    }

    const fn wants_restart(&self, observed: Observed) -> bool {
        self.desired.restart && observed.active && !matches!(self.desired.active, Some(false))
    }
}

impl Resource for ServiceResource<'_> {
    fn description(&self) -> String {
        match self.scope {
            ServiceScope::User => format!("{} (user)", self.service),
            ServiceScope::System => self.service.clone(),
        }
    }

    fn current_state(&self) -> Result<ResourceState> {
        let observed = self.observe()?;
        let diffs = self.differences(observed);
        if !diffs.is_empty() {
            return Ok(ResourceState::Incorrect {
                current: diffs.join(", "),
            });
        }
        if self.wants_restart(observed) {
            return Ok(ResourceState::Incorrect {
                current: "restart pending".to_string(),
            });
        }
        Ok(ResourceState::Correct)
    }

    fn apply(&self) -> Result<ResourceChange> {
        let observed = self.observe()?;
        let mut changed = false;

        if let Some(want) = self.desired.enabled
            && want != observed.enabled
        {
            self.systemctl(if want { "enable" } else { "disable" })?;
            changed = true;
        }
        if let Some(want) = self.desired.active
            && want != observed.active
        {
            self.systemctl(if want { "start" } else { "stop" })?;
            changed = true;
        } else if self.wants_restart(observed) {
            self.systemctl("restart")?;
            changed = true;
        }

        Ok(if changed {
            ResourceChange::Applied
        } else {
            ResourceChange::AlreadyCorrect
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::resources::test_helpers::MockExecutor;

    const RUNNING: DesiredService = DesiredService {
        enabled: Some(true),
        active: Some(true),
        restart: false,
    };

    #[test]
    fn matching_unit_is_correct() {
        let exec = MockExecutor::with_responses(vec![(true, "enabled"), (true, "active")]);
        let svc = ServiceResource::new("waycorner".into(), ServiceScope::User, RUNNING, &exec);
        assert_eq!(svc.current_state().unwrap(), ResourceState::Correct);
        assert_eq!(
            exec.calls(),
            vec![
                "systemctl --user is-enabled waycorner",
                "systemctl --user is-active waycorner"
            ]
        );
    }

    #[test]
    fn only_differing_aspect_is_changed() {
        // enabled already, not running: only `start` should be issued
        let exec = MockExecutor::with_responses(vec![
            (true, "enabled"),
            (false, "inactive"),
            (true, ""),
        ]);
        let svc = ServiceResource::new("waycorner".into(), ServiceScope::User, RUNNING, &exec);

        assert_eq!(svc.apply().unwrap(), ResourceChange::Applied);

        let calls = exec.calls();
        assert_eq!(calls.last().unwrap(), "systemctl --user start waycorner");
        assert!(!calls.iter().any(|c| c.contains(" enable ")));
    }

    #[test]
    fn system_scope_mutations_use_sudo() {
        let exec = MockExecutor::with_responses(vec![
            (false, "disabled"),
            (false, "inactive"),
            (true, ""),
            (true, ""),
        ]);
        let svc = ServiceResource::new("sshd".into(), ServiceScope::System, RUNNING, &exec);

        svc.apply().unwrap();

        let calls = exec.calls();
        assert_eq!(calls[0], "systemctl is-enabled sshd");
        assert_eq!(calls[2], "sudo systemctl enable sshd");
        assert_eq!(calls[3], "sudo systemctl start sshd");
    }

    #[test]
    fn restart_requested_on_running_unit() {
        let desired = DesiredService {
            restart: true,
            ..RUNNING
        };
        let exec = MockExecutor::with_responses(vec![
            (true, "enabled"),
            (true, "active"),
            (true, "enabled"),
            (true, "active"),
            (true, ""),
        ]);
        let svc = ServiceResource::new("waybar".into(), ServiceScope::User, desired, &exec);

        assert!(matches!(
            svc.current_state().unwrap(),
            ResourceState::Incorrect { .. }
        ));
        assert_eq!(svc.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(
            exec.calls().last().unwrap(),
            "systemctl --user restart waybar"
        );
    }

    #[test]
    fn failing_transition_is_external_command_error() {
        let exec = MockExecutor::with_responses(vec![
            (false, "disabled"),
            (true, "active"),
            (false, ""),
        ]);
        let desired = DesiredService {
            enabled: Some(true),
            ..DesiredService::default()
        };
        let svc = ServiceResource::new("x".into(), ServiceScope::User, desired, &exec);
        let err = svc.apply().unwrap_err();
        assert!(err.to_string().contains("systemctl --user enable x"));
    }

    #[test]
    fn disabling_stopped_unit_reports_state() {
        let desired = DesiredService {
            enabled: Some(false),
            active: Some(false),
            restart: false,
        };
        let exec = MockExecutor::with_responses(vec![(true, "enabled"), (true, "active")]);
        let svc = ServiceResource::new("waybar".into(), ServiceScope::User, desired, &exec);
        assert_eq!(
            svc.current_state().unwrap(),
            ResourceState::Incorrect {
                current: "enabled, active".to_string()
            }
        );
    }
}
