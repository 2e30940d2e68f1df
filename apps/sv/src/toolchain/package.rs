//! Distribution packages.
//!
//! A `Package` describes one downloadable Go archive: which tag it belongs
//! to, where it lives, and how to verify and unpack it. Packages come either
//! from the release catalog (with a checksum) or from file-name templating
//! when the catalog has nothing to say (without one).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::platform::Platform;
use crate::errors::ChecksumError;

/// Supported archive formats, identified by file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// Classifies a file name by suffix. Returns `None` for anything else.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(Self::from_file_name)
    }
}

/// Digest algorithms accepted for package verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl FromStr for ChecksumAlgorithm {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "SHA1" => Ok(Self::Sha1),
            "SHA256" => Ok(Self::Sha256),
            "SHA512" => Ok(Self::Sha512),
            _ => Err(ChecksumError::UnsupportedAlgorithm {
                name: s.to_string(),
            }),
        }
    }
}

/// One downloadable Go distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    tag: String,
    file_name: String,
    url: String,
    os: String,
    arch: String,
    checksum: Option<String>,
    algorithm: String,
}

impl Package {
    /// Builds a package by file-name templating: `<tag>.<os>-<arch>.<ext>`
    /// served from `<base_url>/dl/<name>`. No checksum is known.
    #[must_use]
    pub fn from_template(tag: &str, base_url: &str, platform: Platform) -> Self {
        let file_name = format!(
            "{tag}.{}-{}.{}",
            platform.os(),
            platform.arch(),
            platform.archive_extension()
        );
        Self {
            tag: tag.to_string(),
            url: download_url(base_url, &file_name),
            file_name,
            os: platform.os().to_string(),
            arch: platform.arch().to_string(),
            checksum: None,
            algorithm: "SHA256".to_string(),
        }
    }

    /// Builds a package from a catalog record.
    #[must_use]
    pub fn from_catalog(
        tag: &str,
        base_url: &str,
        file_name: &str,
        os: &str,
        arch: &str,
        sha256: Option<&str>,
    ) -> Self {
        Self {
            tag: tag.to_string(),
            url: download_url(base_url, file_name),
            file_name: file_name.to_string(),
            os: os.to_string(),
            arch: arch.to_string(),
            checksum: sha256
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            algorithm: "SHA256".to_string(),
        }
    }

    #[must_use = "returns the tag without side effects"]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use = "returns the file name without side effects"]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use = "returns the URL without side effects"]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Expected hex digest, if the source provided one.
    #[must_use = "returns the checksum without side effects"]
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    #[must_use = "returns the algorithm name without side effects"]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    #[must_use]
    pub fn archive_kind(&self) -> Option<ArchiveKind> {
        ArchiveKind::from_file_name(&self.file_name)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}-{})", self.tag, self.os, self.arch)
    }
}

fn download_url(base_url: &str, file_name: &str) -> String {
    format!("{}/dl/{file_name}", base_url.trim_end_matches('/'))
}
