//! Release catalog for Go distributions.
//!
//! The catalog is the JSON listing served at `<base>/dl/?mode=json`. Adding
//! `&include=all` returns every release ever published instead of only the
//! currently supported ones.
//!
//! ```json
//! [
//!   {
//!     "version": "go1.22.0",
//!     "stable": true,
//!     "files": [
//!       {
//!         "filename": "go1.22.0.linux-amd64.tar.gz",
//!         "os": "linux",
//!         "arch": "amd64",
//!         "sha256": "f6c8a87a...",
//!         "size": 68988925,
//!         "kind": "archive"
//!       }
//!     ]
//!   }
//! ]
//! ```

use serde::Deserialize;
use std::time::Duration;

use super::package::Package;
use super::platform::Platform;
use super::version::{GoVersion, sort_newest_first};
use crate::config::Config;
use crate::errors::SvError;

/// One downloadable file of a release.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseFile {
    pub filename: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub size: u64,
    /// `archive`, `installer` or `source`.
    #[serde(default)]
    pub kind: String,
}

/// A release entry in the catalog.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub version: String,
    #[serde(default)]
    pub stable: bool,
    #[serde(default)]
    pub files: Vec<ReleaseFile>,
}

impl Release {
    /// The binary archive for `platform`, ignoring installers and sources.
    #[must_use]
    pub fn archive_for(&self, platform: Platform) -> Option<&ReleaseFile> {
        self.files
            .iter()
            .find(|f| f.kind == "archive" && f.os == platform.os() && f.arch == platform.arch())
    }

    /// The distribution package for `platform`, if the release has one.
    #[must_use]
    pub fn package(&self, base_url: &str, platform: Platform) -> Option<Package> {
        self.archive_for(platform).map(|file| {
            Package::from_catalog(
                &self.version,
                base_url,
                &file.filename,
                &file.os,
                &file.arch,
                Some(file.sha256.as_str()),
            )
        })
    }
}

/// Finds a release by tag.
#[must_use = "returns release info without side effects"]
pub fn find_release<'a>(releases: &'a [Release], tag: &str) -> Option<&'a Release> {
    releases.iter().find(|r| r.version == tag)
}

/// The highest stable release.
#[must_use = "returns release info without side effects"]
pub fn latest_stable(releases: &[Release]) -> Option<&Release> {
    releases
        .iter()
        .filter(|r| r.stable)
        .max_by_key(|r| GoVersion::parse(&r.version))
}

/// All release tags, newest first.
#[must_use = "returns sorted tags without side effects"]
pub fn sorted_tags(releases: &[Release]) -> Vec<String> {
    let mut tags: Vec<String> = releases.iter().map(|r| r.version.clone()).collect();
    sort_newest_first(&mut tags);
    tags.dedup();
    tags
}

/// HTTP client for the release catalog.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl CatalogClient {
    /// Creates a client for the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, SvError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sv/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SvError::catalog(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.http_timeout,
        })
    }

    #[must_use = "returns the base URL without side effects"]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn releases_url(&self, include_all: bool) -> String {
        let mut url = format!("{}/dl/?mode=json", self.base_url);
        if include_all {
            url.push_str("&include=all");
        }
        url
    }

    /// Fetches the release list.
    ///
    /// # Errors
    ///
    /// Returns `SvError::Catalog` if the request fails, the server answers
    /// with an error status, or the body is not valid catalog JSON.
    pub async fn releases(&self, include_all: bool) -> Result<Vec<Release>, SvError> {
        let url = self.releases_url(include_all);
        tracing::debug!(url = %url, "fetching release catalog");

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SvError::catalog(format!("failed to fetch {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(handle_http_error(response.status(), &url));
        }

        let text = response
            .text()
            .await
            .map_err(|e| SvError::catalog(format!("failed to read response from {url}: {e}")))?;

        serde_json::from_str(&text)
            .map_err(|e| SvError::catalog(format!("failed to parse release list from {url}: {e}")))
    }
}

/// Handles HTTP errors with user-friendly messages.
fn handle_http_error(status: reqwest::StatusCode, url: &str) -> SvError {
    match status.as_u16() {
        404 => SvError::catalog(format!("release list not found at {url}")),
        code if code >= 500 => SvError::catalog(format!("server error ({code}): {url}")),
        code => SvError::catalog(format!("HTTP error {code}: {url}")),
    }
}
