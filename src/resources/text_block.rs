//! Marker-delimited text blocks appended to user configuration files.
//!
//! A block looks like:
//!
//! ```text
//! <blank line>
//! # cybex: waycorner
//! exec-once = waycorner
//! # cybex: waycorner end
//! ```
//!
//! Presence of the marker anywhere in the file means the block is installed.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

use super::helpers::fs::{ensure_parent_dir, write_into_place};
use super::{Resource, ResourceChange, ResourceState};

/// A block of lines guarded by a unique marker comment.
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// File to edit.
    pub path: PathBuf,
    /// Unique marker line opening the block.
    pub marker: String,
    /// Lines inserted after the marker.
    pub block: String,
}

impl TextBlock {
    /// Create a new text block resource.
    #[must_use]
    pub const fn new(path: PathBuf, marker: String, block: String) -> Self {
        Self {
            path,
            marker,
            block,
        }
    }

    fn end_marker(&self) -> String {
        format!("{} end", self.marker)
    }

    fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read {}", self.path.display())),
        }
    }

    /// `content` with the block appended.
    #[must_use]
    pub fn insert_into(&self, content: &str) -> String {
        let mut out = content.to_string();
        if !out.is_empty() {
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
        }
        out.push_str(&self.marker);
        out.push('\n');
        for line in self.block.lines() {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&self.end_marker());
        out.push('\n');
        out
    }

    /// `content` with every block for this marker removed.
    ///
    /// Blocks closed by an end line are removed exactly. Blocks without one
    /// fall back to dropping the marker and the following non-empty lines up
    /// to the next blank line, which over- or under-removes when the block
    /// itself contains blank lines.
    #[must_use]
    pub fn strip_from(&self, content: &str) -> String {
        let end = self.end_marker();
        let lines: Vec<&str> = content.lines().collect();
        let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
        let mut i = 0;

        while let Some(line) = lines.get(i) {
            if !line.contains(&self.marker) || line.trim() == end {
                kept.push(line);
                i += 1;
                continue;
            }

            let closing = lines
                .iter()
                .skip(i + 1)
                .position(|l| l.trim() == end)
                .map(|offset| i + 1 + offset);
            i = match closing {
                Some(close) => close + 1,
                None => {
                    let mut j = i + 1;
                    while lines.get(j).is_some_and(|l| !l.trim().is_empty()) {
                        j += 1;
                    }
                    j
                }
            };
            if kept.last().is_some_and(|l| l.trim().is_empty()) {
                kept.pop();
            }
        }

        if kept.is_empty() {
            return String::new();
        }
        let mut out = kept.join("\n");
        if content.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

impl Resource for TextBlock {
    fn description(&self) -> String {
        format!("{} in {}", self.marker, self.path.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        match self.read()? {
            None => Ok(ResourceState::Missing),
            Some(content) if content.contains(&self.marker) => Ok(ResourceState::Correct),
            Some(_) => Ok(ResourceState::Incorrect {
                current: "marker absent".to_string(),
            }),
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        let content = self.read()?;
        if content.as_deref().is_some_and(|c| c.contains(&self.marker)) {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        ensure_parent_dir(&self.path)?;
        write_into_place(&self.path, &self.insert_into(content.as_deref().unwrap_or("")))?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        let Some(content) = self.read()? else {
            return Ok(ResourceChange::AlreadyCorrect);
        };
        if !content.contains(&self.marker) {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        write_into_place(&self.path, &self.strip_from(&content))?;
        Ok(ResourceChange::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn block(path: PathBuf) -> TextBlock {
        TextBlock::new(
            path,
            "# cybex: waycorner".to_string(),
            "exec-once = waycorner\nbind = SUPER, H, exec, hide".to_string(),
        )
    }

    #[test]
    fn apply_appends_block_with_separator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hyprland.conf");
        std::fs::write(&path, "monitor = ,preferred,auto,1").unwrap();
        let b = block(path.clone());

        assert_eq!(b.apply().unwrap(), ResourceChange::Applied);

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "monitor = ,preferred,auto,1\n\n# cybex: waycorner\nexec-once = waycorner\nbind = SUPER, H, exec, hide\n# cybex: waycorner end\n"
        );
    }

    #[test]
    fn apply_twice_inserts_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hyprland.conf");
        std::fs::write(&path, "a\n").unwrap();
        let b = block(path.clone());

        b.apply().unwrap();
        let once = std::fs::read_to_string(&path).unwrap();
        assert_eq!(b.apply().unwrap(), ResourceChange::AlreadyCorrect);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), once);
        assert_eq!(once.matches("# cybex: waycorner\n").count(), 1);
    }

    #[test]
    fn apply_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("conf");
        let b = block(path.clone());
        assert_eq!(b.current_state().unwrap(), ResourceState::Missing);
        b.apply().unwrap();
        assert!(
            std::fs::read_to_string(&path)
                .unwrap()
                .starts_with("# cybex: waycorner\n")
        );
    }

    #[test]
    fn remove_restores_original_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hyprland.conf");
        let original = "monitor = ,preferred,auto,1\ninput = us\n";
        std::fs::write(&path, original).unwrap();
        let b = block(path.clone());

        b.apply().unwrap();
        assert_eq!(b.remove().unwrap(), ResourceChange::Applied);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn remove_keeps_content_after_block() {
        let b = block(PathBuf::from("unused"));
        let content = "a\n\n# cybex: waycorner\nx\n# cybex: waycorner end\nb\n";
        assert_eq!(b.strip_from(content), "a\nb\n");
    }

    #[test]
    fn legacy_block_without_end_line_uses_heuristic() {
        let b = block(PathBuf::from("unused"));
        let content = "a\n\n# cybex: waycorner\nx\ny\n\nz\n";
        assert_eq!(b.strip_from(content), "a\n\nz\n");
    }

    #[test]
    fn remove_on_absent_marker_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf");
        std::fs::write(&path, "untouched\n").unwrap();
        let b = block(path.clone());
        assert!(matches!(
            b.current_state().unwrap(),
            ResourceState::Incorrect { .. }
        ));
        assert_eq!(b.remove().unwrap(), ResourceChange::AlreadyCorrect);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "untouched\n");
    }

    #[test]
    fn remove_on_missing_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let b = block(dir.path().join("absent"));
        assert_eq!(b.remove().unwrap(), ResourceChange::AlreadyCorrect);
        assert!(!dir.path().join("absent").exists());
    }

    #[test]
    fn symlinked_file_stays_a_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("dotfiles").join("bashrc");
        let link = dir.path().join(".bashrc");
        std::fs::create_dir_all(real.parent().unwrap()).unwrap();
        std::fs::write(&real, "alias ll='ls -l'\n").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();
        let b = block(link.clone());

        b.apply().unwrap();
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
        assert!(
            std::fs::read_to_string(&real)
                .unwrap()
                .contains("# cybex: waycorner\n")
        );

        b.remove().unwrap();
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(&real).unwrap(), "alias ll='ls -l'\n");
    }
}
