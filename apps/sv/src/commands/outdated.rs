//! Outdated command for the sv CLI.
//!
//! Compares the active version, or the newest cached one when nothing is
//! active, with the latest stable release.

use anyhow::Result;

use super::latest::fetch_latest;
use crate::config::Config;
use crate::toolchain::VersionManager;

/// Executes the outdated command.
///
/// # Errors
///
/// Returns `AlreadyLatest` when up to date, `NoLocalVersions` when nothing
/// is installed, or a catalog error.
pub async fn execute(config: &Config) -> Result<()> {
    let manager = VersionManager::new(config, false)?;
    let latest = fetch_latest(config).await?;
    let outdated = manager.outdated(&latest)?;

    println!("{} -> {}", outdated.current, outdated.latest);
    println!("Run 'sv install --latest' to upgrade.");
    Ok(())
}
