//! Per-component counters and the outcome of one engine run.
use crate::logging::{ComponentOutcome, ComponentStatus};

/// Counters for the actions of one component.
///
/// # Examples
///
/// ```
/// use cybex_cli::engine::ActionStats;
///
/// let stats = ActionStats { changed: 1, already_ok: 2, skipped: 3 };
/// assert_eq!(stats.summary(false), "1 changed, 2 already ok, 3 skipped");
/// assert_eq!(stats.summary(true), "1 would change, 2 already ok, 3 skipped");
///
/// let clean = ActionStats { changed: 0, already_ok: 4, skipped: 0 };
/// assert_eq!(clean.summary(false), "0 changed, 4 already ok");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ActionStats {
    /// Actions that changed (or, in dry-run, would change) the machine.
    pub changed: u32,
    /// Actions already in their desired state.
    pub already_ok: u32,
    /// Actions skipped (declined, not ours, not applicable).
    pub skipped: u32,
}

impl ActionStats {
    /// Format the summary string (e.g. "3 changed, 10 already ok, 1 skipped").
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        if self.skipped > 0 {
            format!(
                "{} {verb}, {} already ok, {} skipped",
                self.changed, self.already_ok, self.skipped
            )
        } else {
            format!("{} {verb}, {} already ok", self.changed, self.already_ok)
        }
    }

    /// Final status of a component that ran all its actions without error.
    #[must_use]
    pub const fn status(&self, dry_run: bool) -> ComponentStatus {
        match (self.changed > 0, dry_run) {
            (true, true) => ComponentStatus::DryRun,
            (true, false) => ComponentStatus::Applied,
            (false, _) => ComponentStatus::Skipped,
        }
    }
}

/// Everything that happened in one engine run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// One entry per component that started, in execution order.
    pub outcomes: Vec<ComponentOutcome>,
    /// Why the run stopped early, if it did.
    pub aborted: Option<String>,
    /// Components on which at least one mutation was attempted.
    pub touched: Vec<String>,
}

impl ExecutionReport {
    /// Number of failed components.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.with_status(ComponentStatus::Failed).count()
    }

    /// Names of components that ended with `status`.
    pub fn with_status(&self, status: ComponentStatus) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(move |o| o.status == status)
            .map(|o| o.name.as_str())
    }

    /// Status recorded for `name`, if it ran.
    #[must_use]
    pub fn status_of(&self, name: &str) -> Option<ComponentStatus> {
        self.outcomes
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.status)
    }

    /// Components that failed (or were interrupted) after a mutation was
    /// attempted on them, so their state may be half applied.
    #[must_use]
    pub fn partially_applied(&self) -> Vec<&str> {
        self.touched
            .iter()
            .map(String::as_str)
            .filter(|name| self.status_of(name) == Some(ComponentStatus::Failed))
            .collect()
    }

}
