//! Timestamped sibling backups: `<path>.bak.<YYYYmmddHHMMSS>`.
//!
//! Backups are created before a file is overwritten and are never deleted by
//! the engine. The most recent one is found by parsing the suffix, not by
//! sorting file names.
use anyhow::{Context as _, Result};
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};

use super::helpers::fs::{copy_into_place, with_suffix};

/// `strftime` format of the backup suffix (local time, second granularity).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const TIMESTAMP_LEN: usize = 14;
const BACKUP_INFIX: &str = ".bak.";

/// Outcome of [`backup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// A new backup was written.
    Created(PathBuf),
    /// A backup with this timestamp already exists; nothing was copied.
    AlreadyCovered(PathBuf),
    /// The original file does not exist.
    NothingToBackUp,
}

/// Outcome of [`restore_latest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The named backup was copied back over the original path.
    Restored(PathBuf),
    /// No parseable backup exists for the path.
    NotFound,
}

/// Backup path for `path` taken at `at`.
#[must_use]
pub fn backup_path(path: &Path, at: NaiveDateTime) -> PathBuf {
    with_suffix(
        path,
        &format!("{BACKUP_INFIX}{}", at.format(TIMESTAMP_FORMAT)),
    )
}

/// Copy `path` to a backup stamped with the current local time.
///
/// # Errors
///
/// Returns an error if the copy fails.
pub fn backup(path: &Path) -> Result<BackupOutcome> {
    backup_at(path, Local::now().naive_local())
}

/// Copy `path` to a backup stamped with `at`.
///
/// # Errors
///
/// Returns an error if the copy fails.
pub fn backup_at(path: &Path, at: NaiveDateTime) -> Result<BackupOutcome> {
    if path.symlink_metadata().is_err() {
        return Ok(BackupOutcome::NothingToBackUp);
    }
    let dest = backup_path(path, at);
    if dest.symlink_metadata().is_ok() {
        return Ok(BackupOutcome::AlreadyCovered(dest));
    }
    std::fs::copy(path, &dest)
        .with_context(|| format!("back up {} to {}", path.display(), dest.display()))?;
    Ok(BackupOutcome::Created(dest))
}

fn parse_suffix(suffix: &str) -> Option<NaiveDateTime> {
    if suffix.len() != TIMESTAMP_LEN || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(suffix, TIMESTAMP_FORMAT).ok()
}

/// All backups of `path`, oldest first. Siblings whose suffix is not a
/// valid timestamp are ignored.
///
/// # Errors
///
/// Returns an error if the parent directory exists but cannot be read.
pub fn list_backups(path: &Path) -> Result<Vec<(NaiveDateTime, PathBuf)>> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let entries = match std::fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("reading directory {}", parent.display()));
        }
    };

    let prefix = format!("{name}{BACKUP_INFIX}");
    let mut backups: Vec<(NaiveDateTime, PathBuf)> = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let file_name = entry.file_name();
            let stamp = parse_suffix(file_name.to_str()?.strip_prefix(&prefix)?)?;
            Some((stamp, entry.path()))
        })
        .collect();
    backups.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(backups)
}

/// The most recent backup of `path`, if any.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be read.
pub fn latest_backup(path: &Path) -> Result<Option<PathBuf>> {
    Ok(list_backups(path)?
        .into_iter()
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, p)| p))
}

/// Copy the most recent backup back over `path`. The backup itself is kept.
///
/// # Errors
///
/// Returns an error if the backup cannot be copied into place.
pub fn restore_latest(path: &Path) -> Result<RestoreOutcome> {
    let Some(latest) = latest_backup(path)? else {
        return Ok(RestoreOutcome::NotFound);
    };
    copy_into_place(&latest, path)
        .with_context(|| format!("restore {} from {}", path.display(), latest.display()))?;
    Ok(RestoreOutcome::Restored(latest))
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn backup_path_uses_fixed_width_suffix() {
        let p = backup_path(Path::new("/home/u/cfg.txt"), at("20250102030405"));
        assert_eq!(p, PathBuf::from("/home/u/cfg.txt.bak.20250102030405"));
    }

    #[test]
    fn backup_of_absent_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = backup(&dir.path().join("missing")).unwrap();
        assert_eq!(outcome, BackupOutcome::NothingToBackUp);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn backup_copies_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cfg.txt");
        std::fs::write(&file, "v1").unwrap();

        let outcome = backup_at(&file, at("20250101000000")).unwrap();

        let BackupOutcome::Created(created) = outcome else {
            panic!("expected a new backup, got {outcome:?}");
        };
        assert_eq!(std::fs::read_to_string(created).unwrap(), "v1");
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "v1");
    }

    #[test]
    fn same_second_backup_is_already_covered() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cfg.txt");
        std::fs::write(&file, "v1").unwrap();
        let stamp = at("20250101000000");
        backup_at(&file, stamp).unwrap();
        std::fs::write(&file, "v2").unwrap();

        let outcome = backup_at(&file, stamp).unwrap();

        assert!(matches!(outcome, BackupOutcome::AlreadyCovered(_)));
        assert_eq!(
            std::fs::read_to_string(backup_path(&file, stamp)).unwrap(),
            "v1",
            "existing backup must not be overwritten"
        );
    }

    #[test]
    fn list_backups_ignores_unparseable_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cfg.txt");
        std::fs::write(&file, "x").unwrap();
        std::fs::write(dir.path().join("cfg.txt.bak.20250101000000"), "a").unwrap();
        std::fs::write(dir.path().join("cfg.txt.bak.old"), "b").unwrap();
        std::fs::write(dir.path().join("cfg.txt.bak.20251399000000"), "c").unwrap();
        std::fs::write(dir.path().join("other.txt.bak.20250101000000"), "d").unwrap();

        let backups = list_backups(&file).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].0, at("20250101000000"));
    }

    #[test]
    fn latest_backup_compares_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cfg.txt");
        for stamp in ["20240101000000", "20251231235959", "20250615120000"] {
            std::fs::write(dir.path().join(format!("cfg.txt.bak.{stamp}")), stamp).unwrap();
        }
        let latest = latest_backup(&file).unwrap().unwrap();
        assert!(latest.ends_with("cfg.txt.bak.20251231235959"));
    }

    #[test]
    fn restore_latest_recovers_newest_and_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cfg.txt");
        std::fs::write(dir.path().join("cfg.txt.bak.20240101000000"), "older").unwrap();
        std::fs::write(dir.path().join("cfg.txt.bak.20250101000000"), "newer").unwrap();
        std::fs::write(&file, "payload").unwrap();

        let outcome = restore_latest(&file).unwrap();

        assert!(matches!(outcome, RestoreOutcome::Restored(_)));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "newer");
        assert!(dir.path().join("cfg.txt.bak.20250101000000").exists());
    }

    #[test]
    fn restore_latest_without_backups_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cfg.txt");
        std::fs::write(&file, "payload").unwrap();
        assert_eq!(restore_latest(&file).unwrap(), RestoreOutcome::NotFound);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "payload");
    }

    #[test]
    fn list_backups_in_missing_directory_is_empty() {
        let backups = list_backups(Path::new("/nonexistent/cybex/cfg.txt")).unwrap();
        assert!(backups.is_empty());
    }
}
