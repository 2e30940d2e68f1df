//! Uninstall command for the sv CLI.
//!
//! Removes a cached version and its downloaded archives. The active version
//! cannot be removed.
//!
//! ## Usage
//!
//! ```bash
//! sv uninstall 1.21.7
//! ```

use anyhow::Result;
use clap::Args;

use super::tag_arg;
use crate::config::Config;
use crate::toolchain::VersionManager;

/// Arguments for the uninstall command.
#[derive(Args)]
pub struct UninstallArgs {
    /// Version to remove (e.g., "1.21.7").
    pub tag: String,
}

/// Executes the uninstall command.
///
/// # Errors
///
/// Returns an error if the version is active, not present, or cannot be
/// deleted.
pub fn execute(args: &UninstallArgs, config: &Config) -> Result<()> {
    let tag = tag_arg(&args.tag)?;
    let manager = VersionManager::new(config, false)?;

    manager.remove(&tag)?;
    println!("Removed {tag}.");
    Ok(())
}
