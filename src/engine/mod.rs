//! Execution orchestrator: runs the selected components' action lists in
//! declaration order, isolates failures per component, and builds the
//! [`ExecutionReport`].
//!
//! - [`context`]: shared per-run state (paths, logger, executor, probes)
//! - [`report`]: per-component outcomes and action counters

pub mod context;
mod report;

pub use context::Context;
pub use report::{ActionStats, ExecutionReport};

use anyhow::Result;

use crate::config::components::{Action, Component};
use crate::interrupt::INTERRUPTED;
use crate::logging::{ComponentOutcome, ComponentStatus};
use crate::resources::command::CommandResource;
use crate::resources::deploy::FileDeployment;
use crate::resources::error::ResourceError;
use crate::resources::process::{DaemonRestart, ProcessResource};
use crate::resources::service::{DesiredService, ServiceResource};
use crate::resources::text_block::TextBlock;
use crate::resources::{Resource, ResourceChange, ResourceState};

/// Which action list to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run each component's `apply` list.
    Install,
    /// Run each component's `uninstall` list.
    Uninstall,
}

impl Mode {
    /// Verb for log lines.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
        }
    }
}

/// Whether an action brings its resource into place or takes it away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Apply,
    Remove,
}

/// One action bound to its resource.
struct Step<'a> {
    resource: Box<dyn Resource + 'a>,
    direction: Direction,
    confirm: bool,
    verb: &'static str,
}

/// Build the resource behind `action`.
///
/// `pending` is whether an earlier action of the same component changed
/// something; restarts only happen when it is set.
fn step<'a>(action: &Action, ctx: &'a Context, pending: bool) -> Step<'a> {
    let executor = ctx.executor.as_ref();
    let verb = action.verb();
    let (resource, direction, confirm): (Box<dyn Resource + 'a>, Direction, bool) = match action {
        Action::DeployFile {
            source,
            destination,
        } => (
            Box::new(FileDeployment::new(
                ctx.payload(source),
                ctx.expand(destination),
            )),
            Direction::Apply,
            false,
        ),
        Action::RestoreFile {
            source,
            destination,
        } => (
            Box::new(FileDeployment::new(
                ctx.payload(source),
                ctx.expand(destination),
            )),
            Direction::Remove,
            false,
        ),
        Action::RunPrivileged {
            command,
            unless,
            confirm,
        } => (
            Box::new(CommandResource::new(
                ctx.expand_args(command),
                unless.as_deref().map(|u| ctx.expand_args(u)),
                true,
                executor,
            )),
            Direction::Apply,
            *confirm,
        ),
        Action::RunCommand {
            command,
            unless,
            confirm,
        } => (
            Box::new(CommandResource::new(
                ctx.expand_args(command),
                unless.as_deref().map(|u| ctx.expand_args(u)),
                false,
                executor,
            )),
            Direction::Apply,
            *confirm,
        ),
        Action::EnsureServiceState {
            service,
            scope,
            enabled,
            active,
            restart_on_change,
        } => (
            Box::new(ServiceResource::new(
                service.clone(),
                *scope,
                DesiredService {
                    enabled: *enabled,
                    active: *active,
                    restart: *restart_on_change && pending,
                },
                executor,
            )),
            Direction::Apply,
            false,
        ),
        Action::EnsureProcessRunning { binary, args } => (
            Box::new(ProcessResource::new(binary.clone(), args.clone(), executor)),
            Direction::Apply,
            false,
        ),
        Action::StopProcess { binary } => (
            Box::new(ProcessResource::new(binary.clone(), Vec::new(), executor)),
            Direction::Remove,
            false,
        ),
        Action::RestartDaemon { name, args, helper } => (
            Box::new(DaemonRestart::new(
                name.clone(),
                args.clone(),
                helper.clone(),
                pending,
                executor,
            )),
            Direction::Apply,
            false,
        ),
        Action::MutateTextFile {
            path,
            marker,
            block,
        } => (
            Box::new(TextBlock::new(
                ctx.expand(path),
                marker.clone(),
                block.clone(),
            )),
            Direction::Apply,
            false,
        ),
        Action::RemoveTextBlock { path, marker } => (
            Box::new(TextBlock::new(
                ctx.expand(path),
                marker.clone(),
                String::new(),
            )),
            Direction::Remove,
            false,
        ),
    };
    Step {
        resource,
        direction,
        confirm,
        verb,
    }
}

/// Tracks whether a mutation was attempted while running one component.
#[derive(Debug, Default)]
struct Progress {
    stats: ActionStats,
    touched: bool,
}

/// Run one step, updating `progress`.
fn run_step(step: &Step<'_>, ctx: &Context, progress: &mut Progress) -> Result<()> {
    let desc = step.resource.description();
    let state = step.resource.current_state()?;
    ctx.log.debug(&format!("{} {desc}: {state:?}", step.verb));

    let due = match (step.direction, state) {
        (Direction::Apply, ResourceState::Correct)
        | (
            Direction::Remove,
            ResourceState::Missing | ResourceState::Incorrect { .. },
        ) => false,
        (Direction::Apply, ResourceState::Invalid { reason }) => {
            return Err(ResourceError::InvalidState {
                resource: desc,
                reason,
            }
            .into());
        }
        (Direction::Remove, ResourceState::Invalid { reason }) => {
            ctx.log.debug(&format!("skipping {desc}: {reason}"));
            progress.stats.skipped += 1;
            return Ok(());
        }
        (Direction::Apply, ResourceState::Incorrect { current }) if ctx.dry_run => {
            ctx.log
                .dry_run(&format!("would {} {desc} (currently {current})", step.verb));
            progress.stats.changed += 1;
            return Ok(());
        }
        (Direction::Apply, ResourceState::Missing | ResourceState::Incorrect { .. })
        | (Direction::Remove, ResourceState::Correct) => true,
    };

    if !due {
        progress.stats.already_ok += 1;
        return Ok(());
    }

    if ctx.dry_run {
        ctx.log.dry_run(&format!("would {}: {desc}", step.verb));
        progress.stats.changed += 1;
        return Ok(());
    }

    if step.confirm && !ctx.prompt.confirm(&format!("Run '{desc}'?"))? {
        ctx.log.warn(&format!("declined: {desc}"));
        progress.stats.skipped += 1;
        return Ok(());
    }

    progress.touched = true;
    let change = match step.direction {
        Direction::Apply => step.resource.apply()?,
        Direction::Remove => step.resource.remove()?,
    };
    match change {
        ResourceChange::Applied => {
            ctx.log.info(&format!("{}: {desc}", step.verb));
            progress.stats.changed += 1;
        }
        ResourceChange::AlreadyCorrect => progress.stats.already_ok += 1,
        ResourceChange::Skipped { reason } => {
            ctx.log.debug(&format!("skipped {desc}: {reason}"));
            progress.stats.skipped += 1;
        }
    }
    Ok(())
}

/// How one component ended.
enum Finished {
    Done(ComponentOutcome),
    Interrupted(ComponentOutcome),
}

fn run_component(component: &Component, mode: Mode, ctx: &Context, touched: &mut bool) -> Finished {
    let actions = match mode {
        Mode::Install => component.apply.clone(),
        Mode::Uninstall => component.uninstall_actions(),
    };

    let mut progress = Progress::default();
    let outcome = |status, detail: String| ComponentOutcome {
        name: component.name.clone(),
        status,
        detail: Some(detail),
    };

    for action in &actions {
        if ctx.is_interrupted() {
            *touched |= progress.touched;
            return Finished::Interrupted(outcome(
                ComponentStatus::Failed,
                INTERRUPTED.to_string(),
            ));
        }

        let step = step(action, ctx, progress.stats.changed > 0);
        let result = run_step(&step, ctx, &mut progress);
        *touched |= progress.touched;
        if let Err(e) = result {
            ctx.log.error(&format!(
                "{} failed at {}: {e:#}",
                component.name,
                step.resource.description()
            ));
            return Finished::Done(outcome(ComponentStatus::Failed, format!("{e:#}")));
        }
    }

    let summary = progress.stats.summary(ctx.dry_run);
    ctx.log.info(&summary);
    Finished::Done(outcome(progress.stats.status(ctx.dry_run), summary))
}

/// Run `components` in order, returning what happened to each.
///
/// Component failures are recorded and the run continues with the next
/// component. An interrupt stops the run between actions and is recorded in
/// [`ExecutionReport::aborted`].
#[must_use]
pub fn run(components: &[&Component], mode: Mode, ctx: &Context) -> ExecutionReport {
    let mut report = ExecutionReport::default();

    for component in components {
        if ctx.is_interrupted() {
            report.aborted = Some(INTERRUPTED.to_string());
            break;
        }

        ctx.log
            .stage(&format!("{} {}", mode.verb(), component.title()));
        let mut touched = false;
        let finished = run_component(component, mode, ctx, &mut touched);
        if touched {
            report.touched.push(component.name.clone());
        }
        match finished {
            Finished::Done(outcome) => report.outcomes.push(outcome),
            Finished::Interrupted(outcome) => {
                report.outcomes.push(outcome);
                report.aborted = Some(INTERRUPTED.to_string());
                break;
            }
        }
    }

    report
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::components::ComponentsFile;
    use crate::engine::context::test_context::context;
    use crate::prompt::FixedPrompt;
    use crate::resources::test_helpers::MockExecutor;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    fn components(src: &str) -> Vec<Component> {
        toml::from_str::<ComponentsFile>(src).unwrap().components
    }

    fn write_payload(root: &Path, rel: &str, content: &str) {
        let path = root.join("payload").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    const DEPLOYS: &str = r##"
[[component]]
name = "fish"
[[component.apply]]
kind = "deploy-file"
source = "fish/config.fish"
destination = "~/.config/fish/config.fish"
[[component.apply]]
kind = "mutate-text-file"
path = "~/.bashrc"
marker = "# cybex: fish"
block = "exec fish"

[[component]]
name = "waybar"
[[component.apply]]
kind = "deploy-file"
source = "waybar/missing.jsonc"
destination = "~/.config/waybar/config.jsonc"

[[component]]
name = "brave"
[[component.apply]]
kind = "deploy-file"
source = "brave/flags.conf"
destination = "~/.config/brave-flags.conf"
"##;

    #[test]
    fn failure_is_isolated_to_its_component() {
        let dir = tempfile::tempdir().unwrap();
        write_payload(dir.path(), "fish/config.fish", "set -g fish_greeting\n");
        write_payload(dir.path(), "brave/flags.conf", "--ozone-platform=wayland\n");
        let ctx = context(dir.path(), MockExecutor::default());
        let table = components(DEPLOYS);
        let selected: Vec<&Component> = table.iter().collect();

        let report = run(&selected, Mode::Install, &ctx);

        assert_eq!(report.status_of("fish"), Some(ComponentStatus::Applied));
        assert_eq!(report.status_of("waybar"), Some(ComponentStatus::Failed));
        assert_eq!(report.status_of("brave"), Some(ComponentStatus::Applied));
        assert!(report.outcomes[1]
            .detail
            .as_deref()
            .unwrap()
            .contains("missing.jsonc"));
        assert!(report.aborted.is_none());
        assert_eq!(report.touched, vec!["fish", "brave"]);
    }

    #[test]
    fn second_run_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        write_payload(dir.path(), "fish/config.fish", "set -g fish_greeting\n");
        let ctx = context(dir.path(), MockExecutor::default());
        let table = components(DEPLOYS);
        let fish = [&table[0]];

        let first = run(&fish, Mode::Install, &ctx);
        assert_eq!(first.status_of("fish"), Some(ComponentStatus::Applied));
        assert_eq!(
            first.outcomes[0].detail.as_deref(),
            Some("2 changed, 0 already ok")
        );

        let second = run(&fish, Mode::Install, &ctx);
        assert_eq!(second.status_of("fish"), Some(ComponentStatus::Skipped));
        assert_eq!(
            second.outcomes[0].detail.as_deref(),
            Some("0 changed, 2 already ok")
        );
        assert!(second.touched.is_empty());
    }

    #[test]
    fn dry_run_reports_without_mutating() {
        let dir = tempfile::tempdir().unwrap();
        write_payload(dir.path(), "fish/config.fish", "set -g fish_greeting\n");
        let mut ctx = context(dir.path(), MockExecutor::default());
        ctx.dry_run = true;
        let table = components(DEPLOYS);

        let report = run(&[&table[0]], Mode::Install, &ctx);
        assert_eq!(report.status_of("fish"), Some(ComponentStatus::DryRun));
        assert!(!dir.path().join("home/.config/fish/config.fish").exists());
        assert!(!dir.path().join("home/.bashrc").exists());
        assert!(report.touched.is_empty());
    }

    #[test]
    fn uninstall_reverts_derived_actions() {
        let dir = tempfile::tempdir().unwrap();
        write_payload(dir.path(), "fish/config.fish", "set -g fish_greeting\n");
        let bashrc = dir.path().join("home/.bashrc");
        fs::create_dir_all(bashrc.parent().unwrap()).unwrap();
        fs::write(&bashrc, "alias ll='ls -l'\n").unwrap();
        let ctx = context(dir.path(), MockExecutor::default());
        let table = components(DEPLOYS);

        run(&[&table[0]], Mode::Install, &ctx);
        let report = run(&[&table[0]], Mode::Uninstall, &ctx);

        assert_eq!(report.status_of("fish"), Some(ComponentStatus::Applied));
        assert!(!dir.path().join("home/.config/fish/config.fish").exists());
        assert_eq!(fs::read_to_string(&bashrc).unwrap(), "alias ll='ls -l'\n");
    }

    #[test]
    fn uninstall_leaves_foreign_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        write_payload(dir.path(), "fish/config.fish", "set -g fish_greeting\n");
        let dest = dir.path().join("home/.config/fish/config.fish");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, "# hand written\n").unwrap();
        let ctx = context(dir.path(), MockExecutor::default());
        let table = components(DEPLOYS);

        let report = run(&[&table[0]], Mode::Uninstall, &ctx);
        assert_eq!(report.status_of("fish"), Some(ComponentStatus::Skipped));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "# hand written\n");
    }

    const COMMANDS: &str = r#"
[[component]]
name = "mainline"
[[component.apply]]
kind = "run-privileged"
command = ["pacman", "-S", "linux-mainline"]
unless = ["pacman", "-Q", "linux-mainline"]
confirm = true
"#;

    #[test]
    fn declined_confirmation_skips_command() {
        let dir = tempfile::tempdir().unwrap();
        // unless probe fails, so the command is due
        let ctx = context(dir.path(), MockExecutor::with_responses(vec![(false, "")]))
            .with_prompt(Arc::new(FixedPrompt(false)));
        let table = components(COMMANDS);

        let report = run(&[&table[0]], Mode::Install, &ctx);
        assert_eq!(report.status_of("mainline"), Some(ComponentStatus::Skipped));
        assert_eq!(
            report.outcomes[0].detail.as_deref(),
            Some("0 changed, 0 already ok, 1 skipped")
        );
    }

    #[test]
    fn failing_command_names_the_command() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(
            dir.path(),
            MockExecutor::with_responses(vec![(false, ""), (false, "")]),
        );
        let table = components(COMMANDS);

        let report = run(&[&table[0]], Mode::Install, &ctx);
        assert_eq!(report.status_of("mainline"), Some(ComponentStatus::Failed));
        let detail = report.outcomes[0].detail.as_deref().unwrap();
        assert!(detail.contains("sudo pacman -S linux-mainline"), "{detail}");
        assert_eq!(report.touched, vec!["mainline"]);
    }

    #[test]
    fn restart_daemon_only_after_change() {
        let dir = tempfile::tempdir().unwrap();
        write_payload(dir.path(), "waybar/config.jsonc", "{}\n");
        let table = components(
            r#"
[[component]]
name = "waybar"
[[component.apply]]
kind = "deploy-file"
source = "waybar/config.jsonc"
destination = "~/.config/waybar/config.jsonc"
[[component.apply]]
kind = "restart-daemon"
name = "waybar"
"#,
        );

        // first run: deploy changes, so pkill (no match) + spawn
        let exec = Arc::new(MockExecutor::with_responses(vec![(false, ""), (true, "")]));
        let ctx = context(dir.path(), MockExecutor::default()).with_executor(exec.clone());
        let report = run(&[&table[0]], Mode::Install, &ctx);
        assert_eq!(report.status_of("waybar"), Some(ComponentStatus::Applied));
        assert_eq!(exec.calls(), vec!["pkill -x waybar", "waybar"]);

        // second run: nothing changed, nothing restarted
        let exec = Arc::new(MockExecutor::default());
        let ctx = context(dir.path(), MockExecutor::default()).with_executor(exec.clone());
        let report = run(&[&table[0]], Mode::Install, &ctx);
        assert_eq!(report.status_of("waybar"), Some(ComponentStatus::Skipped));
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn interrupt_stops_before_next_component() {
        let dir = tempfile::tempdir().unwrap();
        write_payload(dir.path(), "fish/config.fish", "x\n");
        let ctx = context(dir.path(), MockExecutor::default());
        crate::interrupt::signal(&ctx.interrupted);
        let table = components(DEPLOYS);
        let selected: Vec<&Component> = table.iter().collect();

        let report = run(&selected, Mode::Install, &ctx);
        assert!(report.outcomes.is_empty());
        assert_eq!(report.aborted.as_deref(), Some(INTERRUPTED));
        assert!(report.partially_applied().is_empty());
    }

    #[test]
    fn directory_destination_fails_component() {
        let dir = tempfile::tempdir().unwrap();
        write_payload(dir.path(), "fish/config.fish", "x\n");
        fs::create_dir_all(dir.path().join("home/.config/fish/config.fish")).unwrap();
        let ctx = context(dir.path(), MockExecutor::default());
        let table = components(DEPLOYS);

        let report = run(&[&table[0]], Mode::Install, &ctx);
        assert_eq!(report.status_of("fish"), Some(ComponentStatus::Failed));
        assert!(report.outcomes[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("directory"));
    }
}
