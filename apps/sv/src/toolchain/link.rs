//! The active version link.
//!
//! `<home>/go` is a symlink to `cache/<tag>`; putting `<home>/go/bin` on
//! `PATH` once is enough to follow every switch. Where symlinks cannot be
//! created, the link is a small pointer file holding the tag instead.
//!
//! Switching removes the old link and creates the new one. Nothing else in
//! the crate writes this path.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::paths::SvPaths;
use crate::errors::ActivationError;

/// Handle on `<home>/go`.
#[derive(Debug, Clone)]
pub struct ActiveLink {
    path: PathBuf,
    cache: PathBuf,
}

impl ActiveLink {
    #[must_use]
    pub fn new(paths: &SvPaths) -> Self {
        Self {
            path: paths.active_link(),
            cache: paths.cache.clone(),
        }
    }

    fn link_error(&self, source: std::io::Error) -> ActivationError {
        ActivationError::Link {
            path: self.path.clone(),
            source,
        }
    }

    /// The tag the link points at, or `None` when nothing is active.
    ///
    /// A dangling symlink still reports its tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the link exists but cannot be read.
    pub fn read(&self) -> Result<Option<String>, ActivationError> {
        let meta = match std::fs::symlink_metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.link_error(e)),
        };

        if meta.file_type().is_symlink() {
            let target = std::fs::read_link(&self.path).map_err(|e| self.link_error(e))?;
            return Ok(target
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string));
        }
        if meta.is_file() {
            let content = std::fs::read_to_string(&self.path).map_err(|e| self.link_error(e))?;
            let tag = content.trim();
            return Ok((!tag.is_empty()).then(|| tag.to_string()));
        }

        tracing::debug!(path = %self.path.display(), "active link is a plain directory");
        Ok(None)
    }

    /// Repoints the link at `cache/<tag>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the old link cannot be removed or the new one
    /// cannot be created.
    pub fn point_to(&self, tag: &str) -> Result<(), ActivationError> {
        self.clear()?;
        let target = self.cache.join(tag);
        create_link(&target, &self.path, tag).map_err(|e| self.link_error(e))?;
        tracing::debug!(link = %self.path.display(), target = %target.display(), "active link updated");
        Ok(())
    }

    /// Removes the link if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the link exists but cannot be removed.
    pub fn clear(&self) -> Result<(), ActivationError> {
        let meta = match std::fs::symlink_metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(self.link_error(e)),
        };
        let removed = if meta.is_dir() {
            std::fs::remove_dir_all(&self.path)
        } else {
            remove_link(&self.path)
        };
        removed.map_err(|e| self.link_error(e))
    }

    /// Directory to use as `GOROOT` for `tag` once it is active.
    #[must_use]
    pub fn goroot(&self, tag: &str) -> PathBuf {
        match std::fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.file_type().is_symlink() => self.path.clone(),
            _ => self.cache.join(tag),
        }
    }
}

#[cfg(unix)]
fn create_link(target: &Path, link: &Path, _tag: &str) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_link(target: &Path, link: &Path, tag: &str) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link).or_else(|_| std::fs::write(link, tag))
}

#[cfg(not(any(unix, windows)))]
fn create_link(_target: &Path, link: &Path, tag: &str) -> std::io::Result<()> {
    std::fs::write(link, tag)
}

#[cfg(windows)]
fn remove_link(path: &Path) -> std::io::Result<()> {
    // Directory symlinks are removed with remove_dir on Windows.
    std::fs::remove_file(path).or_else(|_| std::fs::remove_dir(path))
}

#[cfg(not(windows))]
fn remove_link(path: &Path) -> std::io::Result<()> {
    std::fs::remove_file(path)
}
