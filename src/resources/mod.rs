//! Idempotent resource primitives (check + apply pattern).
//!
//! Every component action is backed by one of these resources. The engine
//! asks a resource for its [`ResourceState`] first and only calls
//! [`Resource::apply`] or [`Resource::remove`] when the state says a change
//! is needed, which is what makes re-running a component a no-op.
pub mod backup;
pub mod command;
pub mod deploy;
pub mod error;
pub mod helpers;
pub mod process;
pub mod service;
pub mod text_block;

use anyhow::Result;

use self::error::ResourceError;

/// State of a resource (file, service, process, …).
///
/// # Examples
///
/// ```
/// use cybex_cli::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let correct = ResourceState::Correct;
/// let wrong = ResourceState::Incorrect { current: "content differs".into() };
/// let skip = ResourceState::Invalid { reason: "destination is a directory".into() };
///
/// assert_ne!(missing, correct);
/// assert_eq!(correct, ResourceState::Correct);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Resource does not exist or is not present.
    Missing,
    /// Resource exists and matches the desired state.
    Correct,
    /// Resource exists but does not match the desired state.
    Incorrect {
        /// The current value of the resource.
        current: String,
    },
    /// Resource cannot be touched (e.g., destination is a directory).
    Invalid {
        /// Reason why the resource cannot be applied.
        reason: String,
    },
}

/// Result of applying or removing a resource.
///
/// # Examples
///
/// ```
/// use cybex_cli::resources::ResourceChange;
///
/// let applied = ResourceChange::Applied;
/// let noop = ResourceChange::AlreadyCorrect;
/// let skipped = ResourceChange::Skipped { reason: "declined".into() };
///
/// assert_eq!(applied, ResourceChange::Applied);
/// assert_ne!(applied, noop);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created, updated, or removed.
    Applied,
    /// Resource was already correct (no change needed).
    AlreadyCorrect,
    /// Resource was skipped without failing.
    Skipped {
        /// Reason why the resource was skipped.
        reason: String,
    },
}

/// Unified interface for resources that can be checked, applied, and removed.
pub trait Resource {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined, including a
    /// missing payload for file deployments.
    fn current_state(&self) -> Result<ResourceState>;

    /// Bring the resource to its desired state.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failures or when an external command fails.
    fn apply(&self) -> Result<ResourceChange>;

    /// Undo a previous [`apply`](Self::apply).
    ///
    /// Only called when [`current_state`](Self::current_state) reports
    /// [`ResourceState::Correct`], i.e. the resource is still ours.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails or is not supported.
    fn remove(&self) -> Result<ResourceChange> {
        Err(ResourceError::UnsupportedOperation {
            operation: "remove".to_string(),
            resource: self.description(),
        }
        .into())
    }
}
