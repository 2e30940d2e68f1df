//! Go toolchain management for the sv CLI.
//!
//! ## Module Structure
//!
//! - [`platform`] - OS and architecture in Go's naming
//! - [`paths`] - On-disk layout under the sv home directory
//! - [`version`] - Tag normalization and ordering
//! - [`package`] - Distribution packages and archive kinds
//! - [`catalog`] - Release catalog client
//! - [`download`] - Segmented, resumable HTTP downloads
//! - [`retry`] - Exponential backoff for downloads
//! - [`progress`] - Shared byte counters and the terminal reporter
//! - [`verify`] - SHA-1 / SHA-256 / SHA-512 checksum verification
//! - [`archive`] - tar.gz and ZIP extraction
//! - [`link`] - The active version link
//! - [`activation`] - Install, switch, remove and prune

pub mod activation;
pub mod archive;
pub mod catalog;
pub mod download;
pub mod link;
pub mod package;
pub mod paths;
pub mod platform;
pub mod progress;
pub mod retry;
pub mod verify;
pub mod version;

pub use activation::{Activation, VersionManager};
pub use catalog::CatalogClient;
pub use package::Package;
pub use paths::SvPaths;
pub use platform::Platform;
pub use version::normalize_tag;
