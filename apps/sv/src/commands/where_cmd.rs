//! Where command for the sv CLI.
//!
//! Prints the cache directory of a version, suitable for `GOROOT`.
//!
//! ## Usage
//!
//! ```bash
//! sv where 1.22.0
//! ```

use anyhow::Result;
use clap::Args;

use super::tag_arg;
use crate::config::Config;
use crate::toolchain::VersionManager;

/// Arguments for the where command.
#[derive(Args)]
pub struct WhereArgs {
    /// Version to locate.
    pub tag: String,
}

/// Executes the where command.
///
/// # Errors
///
/// Returns `NotFound` if the version is not cached.
pub fn execute(args: &WhereArgs, config: &Config) -> Result<()> {
    let manager = VersionManager::new(config, false)?;
    let path = manager.where_is(&tag_arg(&args.tag)?)?;
    println!("{}", path.display());
    Ok(())
}
