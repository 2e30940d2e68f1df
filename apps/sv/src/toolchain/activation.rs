//! Version activation manager.
//!
//! Drives a tag from nothing to active:
//!
//! ```text
//! Absent -> Downloading -> Downloaded -> Verified -> Extracted -> Cached -> Active
//! ```
//!
//! Every step checks what is already on disk first, so re-running an
//! interrupted install picks up where it stopped: a cache entry is activated
//! directly, an archive in `downloads/` skips the network, and part files
//! left by a failed download are resumed by the downloader.

use std::path::{Path, PathBuf};

use super::archive::{extract, single_top_level_dir};
use super::download::Downloader;
use super::link::ActiveLink;
use super::package::Package;
use super::paths::SvPaths;
use super::platform::Platform;
use super::progress::{Progress, ProgressReporter, Status};
use super::retry::{RetryConfig, retry_with_config};
use super::verify::{Verification, verify_package};
use super::version::compare_tags;
use crate::config::Config;
use crate::errors::{ActivationError, DownloadError, ExtractError, SvError};

/// Result of making a tag active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The link was repointed; carries the `go version` output.
    Activated { version_output: String },
    /// The tag was already active; nothing was touched.
    AlreadyActive,
}

/// An entry of `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    pub tag: String,
    pub active: bool,
}

/// What `prune` did, or would do in a dry run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: Vec<String>,
    pub failed: Vec<String>,
    pub dry_run: bool,
}

/// Outcome of comparing the local version with the latest release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outdated {
    pub current: String,
    pub latest: String,
}

/// Owns the on-disk state under the sv home directory.
#[derive(Debug, Clone)]
pub struct VersionManager {
    paths: SvPaths,
    link: ActiveLink,
    downloader: Downloader,
    retry: RetryConfig,
    force: bool,
}

impl VersionManager {
    /// Creates a manager from the runtime configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config, force: bool) -> Result<Self, SvError> {
        let paths = SvPaths::from_config(config);
        let downloader = Downloader::new(config)?;
        Ok(Self::with_parts(paths, downloader, config.retry_config(), force))
    }

    #[must_use]
    pub fn with_parts(
        paths: SvPaths,
        downloader: Downloader,
        retry: RetryConfig,
        force: bool,
    ) -> Self {
        Self {
            link: ActiveLink::new(&paths),
            paths,
            downloader,
            retry,
            force,
        }
    }

    #[must_use = "returns the paths without side effects"]
    pub fn paths(&self) -> &SvPaths {
        &self.paths
    }

    /// The active tag, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the active link cannot be read.
    pub fn active(&self) -> Result<Option<String>, SvError> {
        Ok(self.link.read()?)
    }

    /// The active tag.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveVersion` when nothing is active.
    pub fn current(&self) -> Result<String, SvError> {
        self.active()?.ok_or(SvError::NoActiveVersion)
    }

    /// Cached versions, newest first, with the active one marked.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache or the active link cannot be read.
    pub fn installed(&self) -> Result<Vec<InstalledVersion>, SvError> {
        let active = self.active()?;
        Ok(self
            .paths
            .list_cached()?
            .into_iter()
            .map(|tag| InstalledVersion {
                active: active.as_deref() == Some(tag.as_str()),
                tag,
            })
            .collect())
    }

    /// Path of the cache entry for `tag`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `tag` is not cached.
    pub fn where_is(&self, tag: &str) -> Result<PathBuf, SvError> {
        if self.paths.is_cached(tag) {
            Ok(self.paths.version_dir(tag))
        } else {
            Err(SvError::not_found(tag))
        }
    }

    /// Installs `package` and makes it active.
    ///
    /// With `force`, the archive is downloaded again and the cache entry
    /// replaced even if both exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails after all retries, the
    /// checksum does not match, extraction fails, or activation fails.
    pub async fn install(&self, package: &Package) -> Result<Activation, SvError> {
        let tag = package.tag();
        if !self.force && self.paths.is_cached(tag) {
            tracing::debug!(tag, "cache hit");
            return self.activate(tag).await;
        }

        let archive = self.paths.download_path(package.file_name());
        if package.archive_kind().is_none() {
            return Err(ExtractError::UnknownFormat { path: archive }.into());
        }
        if self.force || !archive.is_file() {
            self.fetch(package, &archive).await?;
        } else {
            tracing::debug!(archive = %archive.display(), "using downloaded archive");
        }

        self.install_archive(package, &archive)?;
        self.activate(tag).await
    }

    /// Activates `tag` from local state only.
    ///
    /// Uses the cache entry if present, otherwise a previously downloaded
    /// archive for this platform.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when neither exists locally.
    pub async fn use_local(
        &self,
        tag: &str,
        platform: Platform,
        base_url: &str,
    ) -> Result<Activation, SvError> {
        if self.active()?.as_deref() == Some(tag) {
            return Ok(Activation::AlreadyActive);
        }
        if self.paths.is_cached(tag) {
            return self.activate(tag).await;
        }

        let package = Package::from_template(tag, base_url, platform);
        let archive = self.paths.download_path(package.file_name());
        if !archive.is_file() {
            return Err(SvError::not_found(tag));
        }
        self.install_archive(&package, &archive)?;
        self.activate(tag).await
    }

    /// Points the active link at `tag` and checks the toolchain runs.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `tag` is not cached, or an activation error if
    /// the link cannot be replaced or `go version` fails. A failed check
    /// leaves the new link in place.
    pub async fn activate(&self, tag: &str) -> Result<Activation, SvError> {
        if !self.paths.is_cached(tag) {
            return Err(SvError::not_found(tag));
        }
        if self.active()?.as_deref() == Some(tag) {
            tracing::debug!(tag, "already active");
            return Ok(Activation::AlreadyActive);
        }

        self.link.point_to(tag)?;
        let version_output = self.sanity_check(tag).await?;
        Ok(Activation::Activated { version_output })
    }

    /// Runs `go version` from the active link.
    ///
    /// # Errors
    ///
    /// Returns `ActivationError::SanityCheck` if the binary cannot be
    /// started or exits unsuccessfully.
    pub async fn sanity_check(&self, tag: &str) -> Result<String, ActivationError> {
        let goroot = self.link.goroot(tag);
        let bin_dir = goroot.join("bin");
        let exe = Platform::detect().map_or("", Platform::executable_extension);
        let go = bin_dir.join(format!("go{exe}"));
        let failed = |message: String| ActivationError::SanityCheck {
            tag: tag.to_string(),
            message,
        };

        let mut search_path = vec![bin_dir];
        if let Some(existing) = std::env::var_os("PATH") {
            search_path.extend(std::env::split_paths(&existing));
        }
        let search_path =
            std::env::join_paths(search_path).map_err(|e| failed(e.to_string()))?;

        let output = tokio::process::Command::new(&go)
            .arg("version")
            .env("GOROOT", &goroot)
            .env("PATH", search_path)
            .output()
            .await
            .map_err(|e| failed(format!("failed to run {}: {e}", go.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(failed(message));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Deletes the cache entry and downloaded archives of `tag`.
    ///
    /// # Errors
    ///
    /// Returns `VersionInUse` if `tag` is active and `NotFound` if there is
    /// nothing to remove.
    pub fn remove(&self, tag: &str) -> Result<(), SvError> {
        if self.active()?.as_deref() == Some(tag) {
            return Err(SvError::version_in_use(tag));
        }

        let cached = self.paths.is_cached(tag);
        let archives = self.paths.archives_for(tag);
        if !cached && archives.is_empty() {
            return Err(SvError::not_found(tag));
        }

        if cached {
            let dir = self.paths.version_dir(tag);
            std::fs::remove_dir_all(&dir)
                .map_err(|e| SvError::io(format!("failed to remove {}", dir.display()), e))?;
        }
        for archive in archives {
            std::fs::remove_file(&archive).map_err(|e| {
                SvError::io(format!("failed to remove {}", archive.display()), e)
            })?;
        }
        tracing::info!(tag, "removed");
        Ok(())
    }

    /// Removes all but the newest `keep` versions. The active version is
    /// always kept; `all` keeps nothing else.
    ///
    /// # Errors
    ///
    /// Returns `NothingToPrune` when no version qualifies.
    pub fn prune(&self, keep: usize, all: bool, dry_run: bool) -> Result<PruneReport, SvError> {
        let active = self.active()?;
        let keep = if all { 0 } else { keep };

        let candidates: Vec<String> = self
            .paths
            .list_cached()?
            .into_iter()
            .enumerate()
            .filter(|(index, tag)| *index >= keep && active.as_deref() != Some(tag.as_str()))
            .map(|(_, tag)| tag)
            .collect();

        if candidates.is_empty() {
            return Err(SvError::NothingToPrune);
        }

        let mut report = PruneReport {
            dry_run,
            ..PruneReport::default()
        };
        if dry_run {
            report.removed = candidates;
            return Ok(report);
        }

        for tag in candidates {
            match self.remove(&tag) {
                Ok(()) => report.removed.push(tag),
                Err(e) => {
                    tracing::warn!(tag = %tag, error = %e, "failed to prune version");
                    report.failed.push(tag);
                }
            }
        }
        Ok(report)
    }

    /// Compares the active version (or the newest cached one) with `latest`.
    ///
    /// # Errors
    ///
    /// Returns `NoLocalVersions` if nothing is installed and `AlreadyLatest`
    /// when the local version is not older than `latest`.
    pub fn outdated(&self, latest: &str) -> Result<Outdated, SvError> {
        let current = match self.active()? {
            Some(tag) => tag,
            None => self
                .paths
                .list_cached()?
                .into_iter()
                .next()
                .ok_or(SvError::NoLocalVersions)?,
        };

        if compare_tags(&current, latest).is_ge() {
            return Err(SvError::AlreadyLatest { tag: current });
        }
        Ok(Outdated {
            current,
            latest: latest.to_string(),
        })
    }

    async fn fetch(&self, package: &Package, archive: &Path) -> Result<(), SvError> {
        let progress = Progress::new(package.file_name(), 0);
        let reporter = ProgressReporter::start(progress.clone());
        let downloader = self.downloader.clone().resume(!self.force);

        let result = retry_with_config(&self.retry, || {
            downloader.download(package.url(), archive, &progress)
        })
        .await;

        let status = if result.is_ok() { Status::Done } else { Status::Failed };
        reporter.finish(status).await;
        result.map_err(|e| match e.last() {
            DownloadError::Status { status: 404, .. } => SvError::not_found(package.tag()),
            _ => SvError::from(e),
        })
    }

    fn install_archive(&self, package: &Package, archive: &Path) -> Result<(), SvError> {
        match verify_package(package, archive) {
            Ok(Verification::Verified) => tracing::debug!(archive = %archive.display(), "checksum verified"),
            Ok(Verification::Skipped) => {}
            Err(e) => {
                // A corrupt archive would fail the same way on every retry.
                if let Err(remove) = std::fs::remove_file(archive) {
                    tracing::warn!(error = %remove, "failed to remove corrupt archive");
                }
                return Err(e.into());
            }
        }
        self.extract_into_cache(package.tag(), archive)
    }

    fn extract_into_cache(&self, tag: &str, archive: &Path) -> Result<(), SvError> {
        let staging = self.paths.staging_dir(tag);
        remove_dir_if_exists(&staging)?;

        let progress = Progress::new(format!("extracting {tag}"), 0);
        let extracted = extract(&staging, archive, &progress)
            .and_then(|()| single_top_level_dir(&staging));
        let root = match extracted {
            Ok(root) => root,
            Err(e) => {
                remove_dir_if_exists(&staging)?;
                return Err(e.into());
            }
        };

        let target = self.paths.version_dir(tag);
        remove_dir_if_exists(&target)?;
        std::fs::rename(&root, &target).map_err(|e| {
            SvError::io(
                format!("failed to move {} to {}", root.display(), target.display()),
                e,
            )
        })?;
        remove_dir_if_exists(&staging)?;
        tracing::debug!(tag, path = %target.display(), "cached");
        Ok(())
    }
}

fn remove_dir_if_exists(dir: &Path) -> Result<(), SvError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SvError::io(format!("failed to remove {}", dir.display()), e)),
    }
}
