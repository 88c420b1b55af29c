//! Domain-specific error types for the cybex engine.
//!
//! Internal modules return typed errors while command handlers at the CLI
//! boundary convert them to [`anyhow::Error`] via the standard `?` operator.
//! `main` inspects the error chain to pick the process exit code.
//!
//! # Error hierarchy
//!
//! ```text
//! CybexError
//! ├── Usage(UsageError)               # bad selector, empty selection
//! ├── Precondition(PreconditionError) # privilege, disk, network gate
//! ├── Registry(RegistryError)         # component table self-check
//! └── Config(ConfigError)             # TOML loading
//! ```
//!
//! Component-local failures (missing payload, failing external command) are
//! [`ResourceError`](crate::resources::error::ResourceError)s and never
//! escape a single component.

use thiserror::Error;

/// Top-level error type for fatal, invocation-wide failures.
#[derive(Error, Debug)]
pub enum CybexError {
    /// The operator passed arguments that cannot be honoured.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// A required capability is missing on this machine.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// The component table is internally inconsistent.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Invalid selector tokens or an empty selection.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UsageError {
    /// A selector matched no component name or alias.
    #[error("unknown component '{token}' (valid: {valid})")]
    UnknownSelector {
        /// The token as typed by the operator.
        token: String,
        /// Comma-separated list of accepted names.
        valid: String,
    },

    /// No selector tokens were given.
    #[error("no components selected (pass one or more names, or 'all')")]
    NoSelection,
}

/// A capability the selected components need is unavailable.
///
/// Every variant names what was checked and, where one exists, the command
/// the operator can run to investigate or fix it.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PreconditionError {
    /// The engine was started as root; it escalates per command instead.
    #[error("refusing to run as root; run as your normal user (sudo is invoked per command)")]
    RunningAsRoot,

    /// `sudo` is not installed or not on `PATH`.
    #[error("sudo is required but was not found on PATH; install it with: pacman -S sudo")]
    SudoUnavailable,

    /// `sudo -v` failed, so privileged commands would not run.
    #[error("sudo authorization failed (exit {exit_code}); check your credentials with: sudo -v")]
    SudoUnauthorized {
        /// Exit code returned by `sudo -v`.
        exit_code: i32,
    },

    /// None of the configured endpoints answered.
    #[error("network unreachable: no response from {endpoints}; check with: curl -I {first}")]
    NetworkUnreachable {
        /// Comma-separated endpoints that were tried.
        endpoints: String,
        /// First endpoint, used in the suggested manual check.
        first: String,
    },

    /// A filesystem has less free space than the selection requires.
    #[error(
        "insufficient disk space on {path}: {available_mb} MB free, {required_mb} MB required; check with: df -m {path}"
    )]
    InsufficientSpace {
        /// Mount point or directory that was checked.
        path: String,
        /// Required free space in megabytes.
        required_mb: u64,
        /// Free space actually available in megabytes.
        available_mb: u64,
    },

    /// A probe itself failed (e.g. `statvfs` error), so the check is inconclusive.
    #[error("could not check {what}: {reason}")]
    ProbeFailed {
        /// What was being checked.
        what: String,
        /// Underlying failure.
        reason: String,
    },
}

/// Inconsistencies detected when building the component registry.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Two components share a canonical name, or a name collides with an alias.
    #[error("component name or alias '{name}' is declared more than once")]
    DuplicateName {
        /// The clashing name.
        name: String,
    },

    /// A component uses the reserved meta-selector as its name or alias.
    #[error("'{name}' is reserved and cannot name a component")]
    ReservedName {
        /// The reserved token.
        name: String,
    },

    /// Two components deploy different payloads to the same destination.
    #[error(
        "components '{first}' and '{second}' both deploy to {destination}; declare 'supersedes' on one of them"
    )]
    AmbiguousDestination {
        /// Destination path as declared.
        destination: String,
        /// Component declared first.
        first: String,
        /// Component declared second.
        second: String,
    },

    /// `after` or `supersedes` names a component that does not exist.
    #[error("component '{component}' references unknown component '{reference}'")]
    UnknownReference {
        /// Component carrying the reference.
        component: String,
        /// The unresolved name.
        reference: String,
    },

    /// `after` names a component declared later in the table.
    #[error("component '{component}' must run after '{after}' but is declared before it")]
    OrderViolation {
        /// Component carrying the constraint.
        component: String,
        /// Component that must come first.
        after: String,
    },
}

/// Errors that arise while loading configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration file does not exist.
    #[error("missing configuration file: {path}")]
    Missing {
        /// Expected location of the file.
        path: String,
    },

    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("invalid configuration in {path}: {message}")]
    Parse {
        /// Path to the offending file.
        path: String,
        /// Parser message.
        message: String,
    },

    /// A `requires` entry is not one of `privilege`, `network`, `disk:<MB>`.
    #[error("invalid requirement '{0}' (expected privilege, network, or disk:<MB>)")]
    InvalidRequirement(String),
}

impl CybexError {
    /// Exit code for this error: `2` for usage errors, `1` otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            _ => 1,
        }
    }
}

/// Map an arbitrary command error to a process exit code.
///
/// Usage errors anywhere in the chain yield `2`; everything else `1`.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    if err.chain().any(|e| e.is::<UsageError>()) {
        return 2;
    }
    err.chain()
        .find_map(|e| e.downcast_ref::<CybexError>())
        .map_or(1, CybexError::exit_code)
}
