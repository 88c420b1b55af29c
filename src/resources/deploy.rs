//! File deployment resource: compare, back up, copy.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::backup::{self, BackupOutcome, RestoreOutcome};
use super::error::ResourceError;
use super::helpers::fs::{copy_into_place, ensure_parent_dir, is_real_dir, remove_existing};
use super::{Resource, ResourceChange, ResourceState};

/// A bundled payload file deployed to a destination on the host.
///
/// `apply` is the deployment protocol: an identical destination is left
/// alone, a differing one is backed up before being replaced. `remove` only
/// acts when the destination still holds the payload bytes, and then
/// restores the most recent backup (or deletes the file if none exists).
#[derive(Debug, Clone)]
pub struct FileDeployment {
    /// Payload file shipped with the tool.
    pub source: PathBuf,
    /// Absolute destination path.
    pub destination: PathBuf,
}

impl FileDeployment {
    /// Create a new deployment.
    #[must_use]
    pub const fn new(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            source,
            destination,
        }
    }

    fn read_payload(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.source).map_err(|_| {
            ResourceError::MissingPayload {
                path: self.source.display().to_string(),
            }
            .into()
        })
    }
}

/// Read `path` for comparison, treating a dangling symlink as absent.
fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
    }
}

impl Resource for FileDeployment {
    fn description(&self) -> String {
        self.destination.display().to_string()
    }

    fn current_state(&self) -> Result<ResourceState> {
        let payload = self.read_payload()?;

        if is_real_dir(&self.destination) {
            return Ok(ResourceState::Invalid {
                reason: "destination is a directory".to_string(),
            });
        }
        if self.destination.symlink_metadata().is_err() {
            return Ok(ResourceState::Missing);
        }
        match read_existing(&self.destination)? {
            None => Ok(ResourceState::Incorrect {
                current: "broken symlink".to_string(),
            }),
            Some(existing) if existing == payload => Ok(ResourceState::Correct),
            Some(_) => Ok(ResourceState::Incorrect {
                current: "content differs".to_string(),
            }),
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        let payload = self.read_payload()?;
        ensure_parent_dir(&self.destination)?;

        if is_real_dir(&self.destination) {
            return Err(ResourceError::InvalidState {
                resource: self.description(),
                reason: "destination is a directory".to_string(),
            }
            .into());
        }

        if let Some(existing) = read_existing(&self.destination)? {
            if existing == payload {
                return Ok(ResourceChange::AlreadyCorrect);
            }
            match backup::backup(&self.destination)? {
                BackupOutcome::Created(path) => {
                    tracing::debug!("backed up {} to {}", self.description(), path.display());
                }
                BackupOutcome::AlreadyCovered(path) => {
                    tracing::debug!("backup {} already exists", path.display());
                }
                BackupOutcome::NothingToBackUp => {}
            }
        }

        copy_into_place(&self.source, &self.destination)?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        if self.current_state()? != ResourceState::Correct {
            return Ok(ResourceChange::Skipped {
                reason: "not managed by cybex".to_string(),
            });
        }
        match backup::restore_latest(&self.destination)? {
            RestoreOutcome::Restored(from) => {
                tracing::debug!("restored {} from {}", self.description(), from.display());
            }
            RestoreOutcome::NotFound => {
                remove_existing(&self.destination)?;
                tracing::debug!("no backup for {}, removed it", self.description());
            }
        }
        Ok(ResourceChange::Applied)
    }
}
