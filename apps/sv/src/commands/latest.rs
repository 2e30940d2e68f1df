//! Latest command for the sv CLI.

use anyhow::Result;

use crate::config::Config;
use crate::errors::SvError;
use crate::toolchain::CatalogClient;
use crate::toolchain::catalog::latest_stable;

/// Prints the latest stable release tag.
///
/// # Errors
///
/// Returns a catalog error if the release list cannot be fetched or has no
/// stable release.
pub async fn execute(config: &Config) -> Result<()> {
    println!("{}", fetch_latest(config).await?);
    Ok(())
}

/// Fetches the tag of the latest stable release.
pub(crate) async fn fetch_latest(config: &Config) -> Result<String, SvError> {
    let releases = CatalogClient::new(config)?.releases(false).await?;
    latest_stable(&releases)
        .map(|release| release.version.clone())
        .ok_or_else(|| SvError::catalog("no stable release published"))
}
