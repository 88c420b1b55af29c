//! Component table from `conf/components.toml`.
//!
//! ```toml
//! categories = ["Desktop", "Shell"]
//!
//! [[component]]
//! name = "waycorner"
//! display_name = "Hot Corners"
//! category = "Desktop"
//! requires = ["privilege", "network", "disk:50"]
//!
//! [[component.apply]]
//! kind = "run-command"
//! command = ["paru", "-S", "--needed", "--noconfirm", "waycorner"]
//! unless = ["pacman", "-Q", "waycorner"]
//!
//! [[component.apply]]
//! kind = "deploy-file"
//! source = "waycorner/config.toml"
//! destination = "~/.config/waycorner/config.toml"
//! ```
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::resources::service::ServiceScope;

/// A capability a component needs before any of its actions can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Requirement {
    /// Commands must run through `sudo`.
    Privilege,
    /// Package mirrors or downloads must be reachable.
    Network,
    /// At least this many megabytes must be free.
    Disk {
        /// Required free space in megabytes.
        megabytes: u64,
    },
}

impl TryFrom<String> for Requirement {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl Requirement {
    /// Parse `privilege`, `network`, or `disk:<MB>`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRequirement`] for anything else.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        match trimmed {
            "privilege" => Ok(Self::Privilege),
            "network" => Ok(Self::Network),
            _ => trimmed
                .strip_prefix("disk:")
                .and_then(|mb| mb.trim().parse::<u64>().ok())
                .map(|megabytes| Self::Disk { megabytes })
                .ok_or_else(|| ConfigError::InvalidRequirement(value.to_string())),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Privilege => write!(f, "privilege"),
            Self::Network => write!(f, "network"),
            Self::Disk { megabytes } => write!(f, "disk:{megabytes}"),
        }
    }
}

/// One step of a component's apply or uninstall list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Action {
    /// Copy a payload file to a destination, backing up what it replaces.
    DeployFile {
        /// Path relative to the payload directory.
        source: PathBuf,
        /// Destination; `~/` expands to the invoking user's home.
        destination: String,
    },
    /// Restore the latest backup of a destination that still holds the payload.
    RestoreFile {
        /// Path relative to the payload directory.
        source: PathBuf,
        /// Destination; `~/` expands to the invoking user's home.
        destination: String,
    },
    /// Run a command through `sudo`.
    RunPrivileged {
        /// Program and arguments (without `sudo`).
        command: Vec<String>,
        /// Probe command; when it exits zero the command is skipped.
        #[serde(default)]
        unless: Option<Vec<String>>,
        /// Ask the operator before running.
        #[serde(default)]
        confirm: bool,
    },
    /// Run a command as the invoking user.
    RunCommand {
        /// Program and arguments.
        command: Vec<String>,
        /// Probe command; when it exits zero the command is skipped.
        #[serde(default)]
        unless: Option<Vec<String>>,
        /// Ask the operator before running.
        #[serde(default)]
        confirm: bool,
    },
    /// Bring a systemd unit to the desired enabled/active state.
    EnsureServiceState {
        /// Unit name.
        service: String,
        /// User or system manager.
        #[serde(default)]
        scope: ServiceScope,
        /// Desired enablement; omitted means "leave as is".
        #[serde(default)]
        enabled: Option<bool>,
        /// Desired activity; omitted means "leave as is".
        #[serde(default)]
        active: Option<bool>,
        /// Restart a running unit when an earlier action changed something.
        #[serde(default)]
        restart_on_change: bool,
    },
    /// Start a helper process if no instance is running.
    EnsureProcessRunning {
        /// Executable name, also used for `pgrep -x`.
        binary: String,
        /// Arguments passed on start.
        #[serde(default)]
        args: Vec<String>,
    },
    /// Stop every instance of a helper process.
    StopProcess {
        /// Executable name, used for `pkill -x`.
        binary: String,
    },
    /// Restart a user-facing daemon when an earlier action changed something.
    RestartDaemon {
        /// Executable name.
        name: String,
        /// Arguments passed when relaunching.
        #[serde(default)]
        args: Vec<String>,
        /// Graceful restart helper preferred when on `PATH`.
        #[serde(default)]
        helper: Option<String>,
    },
    /// Append a marker-delimited block to a text file.
    MutateTextFile {
        /// File to edit; `~/` expands to the invoking user's home.
        path: String,
        /// Unique marker line.
        marker: String,
        /// Lines inserted after the marker.
        block: String,
    },
    /// Remove a marker-delimited block from a text file.
    RemoveTextBlock {
        /// File to edit; `~/` expands to the invoking user's home.
        path: String,
        /// Unique marker line.
        marker: String,
    },
}

impl Action {
    /// The action that undoes this one, when there is an obvious inverse.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        match self {
            Self::DeployFile {
                source,
                destination,
            } => Some(Self::RestoreFile {
                source: source.clone(),
                destination: destination.clone(),
            }),
            Self::MutateTextFile { path, marker, .. } => Some(Self::RemoveTextBlock {
                path: path.clone(),
                marker: marker.clone(),
            }),
            Self::EnsureProcessRunning { binary, .. } => Some(Self::StopProcess {
                binary: binary.clone(),
            }),
            _ => None,
        }
    }

    /// Verb used in log lines ("would deploy: …").
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::DeployFile { .. } => "deploy",
            Self::RestoreFile { .. } => "restore",
            Self::RunPrivileged { .. } | Self::RunCommand { .. } => "run",
            Self::EnsureServiceState { .. } => "reconcile",
            Self::EnsureProcessRunning { .. } => "start",
            Self::StopProcess { .. } => "stop",
            Self::RestartDaemon { .. } => "restart",
            Self::MutateTextFile { .. } => "insert block",
            Self::RemoveTextBlock { .. } => "remove block",
        }
    }
}

/// A named, selectable bundle of actions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Component {
    /// Canonical selector name.
    pub name: String,
    /// Human-readable title for listings.
    #[serde(default)]
    pub display_name: Option<String>,
    /// One-line description for listings.
    #[serde(default)]
    pub description: String,
    /// Listing group.
    #[serde(default)]
    pub category: Option<String>,
    /// Alternate selector names.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Capabilities checked by the precondition gate.
    #[serde(default)]
    pub requires: Vec<Requirement>,
    /// Excluded from the `all` selector; must be named explicitly.
    #[serde(default)]
    pub opt_in: bool,
    /// Changes only take effect after a reboot.
    #[serde(default)]
    pub reboot: bool,
    /// Components that must be declared (and therefore run) earlier.
    #[serde(default)]
    pub after: Vec<String>,
    /// Components whose file destinations this one may take over.
    #[serde(default)]
    pub supersedes: Vec<String>,
    /// Actions run by `install`.
    #[serde(default)]
    pub apply: Vec<Action>,
    /// Actions run by `uninstall`; derived from `apply` when omitted.
    #[serde(default)]
    pub uninstall: Option<Vec<Action>>,
}

impl Component {
    /// Title shown in listings.
    #[must_use]
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Actions run on uninstall.
    ///
    /// When no explicit list is declared, the apply list is walked backwards
    /// and every action with an inverse contributes it.
    #[must_use]
    pub fn uninstall_actions(&self) -> Vec<Action> {
        self.uninstall.clone().unwrap_or_else(|| {
            self.apply
                .iter()
                .rev()
                .filter_map(Action::inverse)
                .collect()
        })
    }

    /// Name and aliases, in declaration order.
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Parsed contents of `conf/components.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentsFile {
    /// Category display order for `cybex list`.
    pub categories: Vec<String>,
    /// Components in declaration (and execution) order.
    #[serde(rename = "component")]
    pub components: Vec<Component>,
}
