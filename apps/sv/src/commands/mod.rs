//! Command modules for the sv CLI.
//!
//! ## Version Commands
//!
//! - [`install`] - Download, verify, extract and activate a version
//! - [`use_cmd`] - Switch the active version
//! - [`uninstall`] - Remove a cached version and its archives
//! - [`prune`] - Remove old cached versions
//!
//! ## Query Commands
//!
//! - [`list`] - List cached or published versions
//! - [`current`] - Print the active version
//! - [`where_cmd`] - Print the cache path of a version
//! - [`latest`] - Print the latest stable release
//! - [`outdated`] - Compare the local version with the latest release

pub mod current;
pub mod install;
pub mod latest;
pub mod list;
pub mod outdated;
pub mod prune;
pub mod uninstall;
pub mod use_cmd;
pub mod where_cmd;

use anyhow::Result;

use crate::config::Config;
use crate::errors::SvError;
use crate::toolchain::catalog::find_release;
use crate::toolchain::{Activation, CatalogClient, Package, Platform, normalize_tag};

/// Normalizes a tag given on the command line.
///
/// Tags become directory names under the cache, so anything that is not a
/// plain file name is refused.
pub(crate) fn tag_arg(input: &str) -> Result<String, SvError> {
    let tag = normalize_tag(input);
    let valid = tag.len() > 2
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        && !tag.contains("..");
    if valid {
        Ok(tag)
    } else {
        Err(SvError::invalid_arguments(format!("not a Go version: {input:?}")))
    }
}

/// Resolves the distribution package for `tag` on this host.
///
/// The catalog supplies the file name and checksum. If the catalog cannot
/// be reached, the package is built from the file-name template and
/// installed without verification.
pub(crate) async fn resolve_package(config: &Config, tag: &str) -> Result<Package> {
    let platform = Platform::detect()?;
    let catalog = CatalogClient::new(config)?;

    match catalog.releases(true).await {
        Ok(releases) => {
            let release = find_release(&releases, tag).ok_or_else(|| SvError::not_found(tag))?;
            let package = release
                .package(catalog.base_url(), platform)
                .ok_or_else(|| SvError::not_found(format!("{tag} ({platform})")))?;
            Ok(package)
        }
        Err(e) => {
            tracing::warn!(error = %e, "release catalog unavailable, installing without checksum");
            Ok(Package::from_template(tag, catalog.base_url(), platform))
        }
    }
}

/// Prints the result of an activation.
pub(crate) fn report_activation(tag: &str, activation: &Activation) {
    match activation {
        Activation::Activated { version_output } => {
            println!("Now using {tag}");
            if !version_output.is_empty() {
                println!("{version_output}");
            }
        }
        Activation::AlreadyActive => println!("{tag} is already in use."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_arg_normalizes() {
        assert_eq!(tag_arg("1.22.0").unwrap(), "go1.22.0");
        assert_eq!(tag_arg("v1.21rc1").unwrap(), "go1.21rc1");
        assert_eq!(tag_arg(" go1.9 ").unwrap(), "go1.9");
    }

    #[test]
    fn tag_arg_rejects_paths_and_empty_input() {
        for input in ["", "go", "../go1.22", "1.22/../../etc", "go1.22\\x", "go 1.22"] {
            assert!(
                matches!(tag_arg(input), Err(SvError::InvalidArguments { .. })),
                "accepted {input:?}"
            );
        }
    }
}
