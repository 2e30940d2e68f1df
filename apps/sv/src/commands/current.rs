//! Current command for the sv CLI.

use anyhow::Result;

use crate::config::Config;
use crate::toolchain::VersionManager;

/// Prints the active version.
///
/// # Errors
///
/// Returns `NoActiveVersion` when nothing is active.
pub fn execute(config: &Config) -> Result<()> {
    let manager = VersionManager::new(config, false)?;
    println!("{}", manager.current()?);
    Ok(())
}
