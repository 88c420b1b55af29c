//! Core logging types: component outcomes, status, and the [`Log`] trait.

/// Final result of one component, as shown in the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentOutcome {
    /// Canonical component name.
    pub name: String,
    /// Final status.
    pub status: ComponentStatus,
    /// Stats line, skip reason, or error description.
    pub detail: Option<String>,
}

/// Status of a finished component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    /// At least one action changed the machine.
    Applied,
    /// Every action was already in its desired state (or declined).
    Skipped,
    /// Dry-run found pending changes; nothing was mutated.
    DryRun,
    /// An action failed; the component's remaining actions did not run.
    Failed,
}

impl ComponentStatus {
    /// Icon used in the summary table.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Applied => "✓",
            Self::Skipped => "·",
            Self::DryRun => "~",
            Self::Failed => "✗",
        }
    }
}

/// Abstraction over logging backends.
///
/// The engine only talks to this trait so tests can capture output without
/// a terminal.
pub trait Log: Send + Sync {
    /// Log a stage header (one per component).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_icons_are_distinct() {
        let icons = [
            ComponentStatus::Applied.icon(),
            ComponentStatus::Skipped.icon(),
            ComponentStatus::DryRun.icon(),
            ComponentStatus::Failed.icon(),
        ];
        for (i, a) in icons.iter().enumerate() {
            for b in icons.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
