//! On-disk layout.
//!
//! ```text
//! ~/.sv/                      # SV_HOME
//!   go -> cache/go1.22.0      # active version link
//!   bin/
//!   cache/
//!     go1.21.7/               # one extracted distribution per tag
//!     go1.22.0/
//!     .staging-go1.22.1/      # in-progress extraction, never listed
//!   downloads/
//!     go1.22.0.linux-amd64.tar.gz
//!     go1/                    # part files of an unfinished download
//! ```

use std::path::{Path, PathBuf};

use super::package::ArchiveKind;
use super::version::sort_newest_first;
use crate::config::Config;
use crate::errors::SvError;

const STAGING_PREFIX: &str = ".staging-";

/// Paths under the sv home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvPaths {
    pub home: PathBuf,
    pub bin: PathBuf,
    pub cache: PathBuf,
    pub downloads: PathBuf,
}

impl SvPaths {
    #[must_use = "returns new paths instance without side effects"]
    pub fn with_home(home: PathBuf) -> Self {
        Self {
            bin: home.join("bin"),
            cache: home.join("cache"),
            downloads: home.join("downloads"),
            home,
        }
    }

    #[must_use = "returns new paths instance without side effects"]
    pub fn from_config(config: &Config) -> Self {
        Self::with_home(config.home.clone())
    }

    /// The active version link, `<home>/go`.
    #[must_use = "returns the path without side effects"]
    pub fn active_link(&self) -> PathBuf {
        self.home.join("go")
    }

    #[must_use = "returns the path without side effects"]
    pub fn version_dir(&self, tag: &str) -> PathBuf {
        self.cache.join(tag)
    }

    #[must_use = "returns the path without side effects"]
    pub fn staging_dir(&self, tag: &str) -> PathBuf {
        self.cache.join(format!("{STAGING_PREFIX}{tag}"))
    }

    #[must_use = "returns the path without side effects"]
    pub fn download_path(&self, file_name: &str) -> PathBuf {
        self.downloads.join(file_name)
    }

    #[must_use = "returns cache status without side effects"]
    pub fn is_cached(&self, tag: &str) -> bool {
        self.version_dir(tag).is_dir()
    }

    /// Tags with a cache entry, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory exists but cannot be read.
    pub fn list_cached(&self) -> Result<Vec<String>, SvError> {
        if !self.cache.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.cache).map_err(|e| {
            SvError::io(format!("failed to read {}", self.cache.display()), e)
        })?;

        let mut tags = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if path.is_dir()
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
                && !name.starts_with('.')
            {
                tags.push(name.to_string());
            }
        }
        sort_newest_first(&mut tags);
        Ok(tags)
    }

    /// Downloaded archives belonging to `tag`, for any platform.
    ///
    /// Matches `<tag>.<os>-<arch>.<ext>`; `go1.21` does not match
    /// `go1.21.0.linux-amd64.tar.gz`.
    #[must_use]
    pub fn archives_for(&self, tag: &str) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.downloads) else {
            return Vec::new();
        };
        let prefix = format!("{tag}.");
        let mut archives: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|path| path.is_file() && ArchiveKind::from_path(path).is_some())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.strip_prefix(&prefix))
                    .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_alphabetic()))
            })
            .collect();
        archives.sort();
        archives
    }

    /// Creates `bin/`, `cache/` and `downloads/` if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn ensure_directories(&self) -> Result<(), SvError> {
        for dir in [&self.home, &self.bin, &self.cache, &self.downloads] {
            create_dir(dir)?;
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<(), SvError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| SvError::io(format!("failed to create directory {}", dir.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_at_home() {
        let paths = SvPaths::with_home(PathBuf::from("/tmp/sv"));
        assert_eq!(paths.bin, PathBuf::from("/tmp/sv/bin"));
        assert_eq!(paths.cache, PathBuf::from("/tmp/sv/cache"));
        assert_eq!(paths.downloads, PathBuf::from("/tmp/sv/downloads"));
        assert_eq!(paths.active_link(), PathBuf::from("/tmp/sv/go"));
        assert_eq!(paths.version_dir("go1.22.0"), PathBuf::from("/tmp/sv/cache/go1.22.0"));
        assert_eq!(
            paths.staging_dir("go1.22.0"),
            PathBuf::from("/tmp/sv/cache/.staging-go1.22.0")
        );
    }

    #[test]
    fn list_cached_is_empty_without_cache_dir() {
        let temp = tempfile::tempdir().unwrap();
        let paths = SvPaths::with_home(temp.path().join("missing"));
        assert!(paths.list_cached().unwrap().is_empty());
    }

    #[test]
    fn list_cached_sorts_and_skips_staging_and_files() {
        let temp = tempfile::tempdir().unwrap();
        let paths = SvPaths::with_home(temp.path().to_path_buf());
        paths.ensure_directories().unwrap();
        for tag in ["go1.9", "go1.21.0", "go1.10", ".staging-go1.22.0"] {
            std::fs::create_dir(paths.cache.join(tag)).unwrap();
        }
        std::fs::write(paths.cache.join("notes.txt"), b"").unwrap();

        assert_eq!(paths.list_cached().unwrap(), vec!["go1.21.0", "go1.10", "go1.9"]);
        assert!(paths.is_cached("go1.10"));
        assert!(!paths.is_cached("go1.22.0"));
    }

    #[test]
    fn archives_for_matches_exact_tag() {
        let temp = tempfile::tempdir().unwrap();
        let paths = SvPaths::with_home(temp.path().to_path_buf());
        paths.ensure_directories().unwrap();
        for name in [
            "go1.21.linux-amd64.tar.gz",
            "go1.21.0.linux-amd64.tar.gz",
            "go1.21rc1.linux-amd64.tar.gz",
            "go1.21.windows-amd64.zip",
            "go1.21.linux-amd64.tar.gz.tmp",
        ] {
            std::fs::write(paths.downloads.join(name), b"x").unwrap();
        }

        let found = paths.archives_for("go1.21");
        assert_eq!(
            found,
            vec![
                paths.downloads.join("go1.21.linux-amd64.tar.gz"),
                paths.downloads.join("go1.21.windows-amd64.zip"),
            ]
        );
    }
}
