//! Error types for the sv CLI.
//!
//! Each pipeline stage has its own error enum so callers can match on the
//! failure that actually happened. `SvError` is the top-level type that
//! command functions surface through `anyhow`; `main` downcasts to it to pick
//! between an informational notice and a real failure.

use std::path::PathBuf;
use thiserror::Error;

use crate::toolchain::retry::RetryError;

/// Failure while fetching a file over HTTP.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The request could not be built (empty URL, empty file name).
    #[error("invalid download request: {message}")]
    InvalidRequest {
        /// What was wrong with the request.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status code returned by the server.
        status: u16,
    },

    /// The request did not complete within its deadline.
    #[error("request timed out: {url}")]
    Timeout {
        /// Requested URL.
        url: String,
    },

    /// The server answered, but not the way a ranged transfer requires.
    #[error("protocol error from {url}: {message}")]
    Protocol {
        /// Requested URL.
        url: String,
        /// What was unexpected about the response.
        message: String,
    },

    /// Transport-level failure (DNS, TLS, connection reset).
    #[error("network error for {url}")]
    Network {
        /// Requested URL.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// Reading or writing a local file failed.
    #[error("I/O error on {}", path.display())]
    Io {
        /// File that was being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A part task panicked or was cancelled.
    #[error("download worker for part {index} did not finish")]
    Worker {
        /// Index of the part whose task failed.
        index: usize,
    },
}

impl DownloadError {
    /// Classifies a client error as a timeout or a generic network failure.
    #[must_use]
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                source,
            }
        }
    }

    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn protocol(url: &str, message: impl Into<String>) -> Self {
        Self::Protocol {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

/// Failure while verifying a file digest.
#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error("Checksum verification failed for {}: expected {expected}, got {actual}", path.display())]
    Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("unsupported checksum algorithm: {name}")]
    UnsupportedAlgorithm { name: String },

    #[error("failed to read {} for checksum", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while unpacking an archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file name does not end in a known archive suffix.
    #[error("unknown archive format: {}", path.display())]
    UnknownFormat {
        /// Archive that could not be classified.
        path: PathBuf,
    },

    /// An entry would land outside the destination directory.
    #[error("archive entry escapes the destination directory: {entry}")]
    PathTraversal {
        /// The entry name as stored in the archive.
        entry: String,
    },

    /// The archive itself is malformed.
    #[error("corrupt archive {}: {message}", path.display())]
    Corrupt {
        /// Archive being read.
        path: PathBuf,
        /// Decoder error message.
        message: String,
    },

    /// The archive did not unpack into a single top-level directory.
    #[error("unexpected archive layout in {}: {message}", path.display())]
    UnexpectedLayout {
        /// Directory the archive was unpacked into.
        path: PathBuf,
        /// What was found instead.
        message: String,
    },

    /// Creating a directory or writing a file failed.
    #[error("I/O error on {}", path.display())]
    Io {
        /// Path being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure while repointing the active version.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("failed to update active version link {}", path.display())]
    Link {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The freshly activated toolchain did not run.
    #[error("{tag} was activated but `go version` failed: {message}")]
    SanityCheck { tag: String, message: String },
}

/// How `main` should present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A notice: printed to stdout, exit code 0.
    Info,
    /// A real failure: printed to stderr, exit code 1.
    Error,
}

/// Consolidated error type for sv operations.
#[derive(Debug, Error)]
pub enum SvError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Every download attempt failed.
    #[error("download failed")]
    Retry(#[from] RetryError<DownloadError>),

    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Activation(#[from] ActivationError),

    /// Attempted to remove the version the active link points at.
    #[error("{tag} is currently in use; switch to another version first")]
    VersionInUse { tag: String },

    /// The tag exists neither locally nor in the release catalog.
    #[error("version {tag} not found")]
    NotFound { tag: String },

    /// Fetching or decoding the release catalog failed.
    #[error("release catalog error: {message}")]
    Catalog { message: String },

    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("nothing to prune")]
    NothingToPrune,

    #[error("{tag} is already the latest version")]
    AlreadyLatest { tag: String },

    #[error("no versions installed locally")]
    NoLocalVersions,

    #[error("no active Go version")]
    NoActiveVersion,
}

impl SvError {
    #[must_use]
    pub fn not_found(tag: impl Into<String>) -> Self {
        Self::NotFound { tag: tag.into() }
    }

    #[must_use]
    pub fn version_in_use(tag: impl Into<String>) -> Self {
        Self::VersionInUse { tag: tag.into() }
    }

    #[must_use]
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    #[must_use]
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Whether this error is a notice rather than a failure.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::NothingToPrune
            | Self::AlreadyLatest { .. }
            | Self::NoLocalVersions
            | Self::NoActiveVersion => Severity::Info,
            _ => Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_in_use_displays_tag() {
        let err = SvError::version_in_use("go1.21.0");
        assert_eq!(
            err.to_string(),
            "go1.21.0 is currently in use; switch to another version first"
        );
        assert_eq!(err.severity(), Severity::Error);
    }

    #[test]
    fn informational_variants_have_info_severity() {
        assert_eq!(SvError::NothingToPrune.severity(), Severity::Info);
        assert_eq!(SvError::NoLocalVersions.severity(), Severity::Info);
        assert_eq!(SvError::NoActiveVersion.severity(), Severity::Info);
        let latest = SvError::AlreadyLatest {
            tag: "go1.22.0".to_string(),
        };
        assert_eq!(latest.severity(), Severity::Info);
        assert_eq!(latest.to_string(), "go1.22.0 is already the latest version");
    }

    #[test]
    fn status_error_displays_code_and_url() {
        let err = DownloadError::Status {
            url: "https://go.dev/dl/x.tar.gz".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 from https://go.dev/dl/x.tar.gz");
    }

    #[test]
    fn checksum_mismatch_displays_both_values() {
        let err = ChecksumError::Mismatch {
            path: PathBuf::from("/tmp/a.tar.gz"),
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Checksum verification failed for /tmp/a.tar.gz: expected abc123, got def456"
        );
    }

    #[test]
    fn wrapped_stage_errors_keep_their_message() {
        let err = SvError::from(ExtractError::PathTraversal {
            entry: "../evil".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "archive entry escapes the destination directory: ../evil"
        );
        assert_eq!(err.severity(), Severity::Error);
    }
}
