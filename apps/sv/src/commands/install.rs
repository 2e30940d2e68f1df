//! Install command for the sv CLI.
//!
//! Downloads a Go release, verifies its checksum, unpacks it into the cache
//! and makes it the active version.
//!
//! ## Usage
//!
//! ```bash
//! sv install            # Install the latest stable release
//! sv install --latest   # Same, explicitly
//! sv install 1.22.0     # Install a specific release
//! sv --force install 1.22.0
//! ```

use anyhow::{Context, Result};
use clap::Args;

use super::{report_activation, resolve_package, tag_arg};
use crate::config::Config;
use crate::errors::SvError;
use crate::toolchain::catalog::latest_stable;
use crate::toolchain::{CatalogClient, Platform, VersionManager};

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Version to install (e.g., "1.22.0", "go1.22.0").
    ///
    /// If omitted, installs the latest stable release.
    pub tag: Option<String>,

    /// Install the latest stable release.
    #[clap(long, conflicts_with = "tag")]
    pub latest: bool,
}

/// Executes the install command.
///
/// # Errors
///
/// Returns an error if the release cannot be resolved, the download fails
/// after all retries, verification or extraction fails, or the installed
/// toolchain does not run.
pub async fn execute(args: &InstallArgs, config: &Config, force: bool) -> Result<()> {
    let manager = VersionManager::new(config, force)?;

    let package = match args.tag.as_deref() {
        Some(tag) if !args.latest => resolve_package(config, &tag_arg(tag)?).await?,
        _ => {
            println!("Fetching release list...");
            let catalog = CatalogClient::new(config)?;
            let releases = catalog.releases(false).await?;
            let release = latest_stable(&releases)
                .ok_or_else(|| SvError::catalog("no stable release published"))?;
            let platform = Platform::detect()?;
            release
                .package(catalog.base_url(), platform)
                .ok_or_else(|| SvError::not_found(format!("{} ({platform})", release.version)))?
        }
    };

    let tag = package.tag().to_string();
    println!("Installing {package}...");
    let activation = manager
        .install(&package)
        .await
        .with_context(|| format!("Failed to install {tag}"))?;

    report_activation(&tag, &activation);
    Ok(())
}
