//! File-system resource helpers.
use anyhow::{Context as _, Result, bail};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    Ok(())
}

/// Remove an existing file or symlink at `path`, including broken symlinks.
///
/// Does nothing if `path` does not exist.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_existing(path: &Path) -> Result<()> {
    if path.symlink_metadata().is_ok() {
        std::fs::remove_file(path)
            .with_context(|| format!("remove existing: {}", path.display()))?;
    }
    Ok(())
}

/// Return `path` with `suffix` appended to its final component.
#[must_use]
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Whether `path` is a real directory (not a symlink to one).
#[must_use]
pub fn is_real_dir(path: &Path) -> bool {
    path.symlink_metadata().is_ok_and(|m| m.is_dir())
}

/// Copy `source` over `target`: stage to a temp sibling, then rename it into
/// place so readers never see a half-written file.
///
/// An existing symlink at `target` is replaced, not followed. Permission
/// bits of `source` are carried over by [`std::fs::copy`].
///
/// # Errors
///
/// Returns an error if `target` is a directory or any file operation fails.
pub fn copy_into_place(source: &Path, target: &Path) -> Result<()> {
    if is_real_dir(target) {
        bail!("{} is a directory", target.display());
    }
    let tmp = with_suffix(target, ".cybex-tmp");
    remove_existing(&tmp)?;
    std::fs::copy(source, &tmp)
        .with_context(|| format!("copy {} to {}", source.display(), tmp.display()))?;

    if let Err(e) = std::fs::rename(&tmp, target) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e)
            .with_context(|| format!("rename {} to {}", tmp.display(), target.display()));
    }
    Ok(())
}

/// Replace the contents of `target` with `contents` via a temp sibling.
///
/// A symlink at `target` is followed: the file it points to is rewritten and
/// the link itself stays in place.
///
/// # Errors
///
/// Returns an error if the temp file cannot be written or renamed, or if
/// `target` is a dangling symlink.
pub fn write_into_place(target: &Path, contents: &str) -> Result<()> {
    let resolved;
    let target = if target
        .symlink_metadata()
        .is_ok_and(|m| m.file_type().is_symlink())
    {
        resolved = dunce::canonicalize(target)
            .with_context(|| format!("resolve symlink: {}", target.display()))?;
        resolved.as_path()
    } else {
        target
    };
    let tmp = with_suffix(target, ".cybex-tmp");
    std::fs::write(&tmp, contents).with_context(|| format!("write {}", tmp.display()))?;
    if let Ok(meta) = std::fs::metadata(target) {
        std::fs::set_permissions(&tmp, meta.permissions())
            .with_context(|| format!("copy permissions to {}", tmp.display()))?;
    }
    if let Err(e) = std::fs::rename(&tmp, target) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e)
            .with_context(|| format!("rename {} to {}", tmp.display(), target.display()));
    }
    Ok(())
}
