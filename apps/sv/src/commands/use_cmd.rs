//! Use command for the sv CLI.
//!
//! Switches the active version. Local state is tried first: a cached
//! version, then a downloaded archive. With `--remote`, a version that is
//! not available locally is installed from the release catalog.
//!
//! ## Usage
//!
//! ```bash
//! sv use 1.21.7
//! sv use go1.22.0 --remote
//! ```

use anyhow::Result;
use clap::Args;

use super::{report_activation, resolve_package, tag_arg};
use crate::config::Config;
use crate::errors::SvError;
use crate::toolchain::{Platform, VersionManager};

/// Arguments for the use command.
#[derive(Args)]
pub struct UseArgs {
    /// Version to switch to (e.g., "1.21.7", "go1.21.7").
    pub tag: String,

    /// Install the version from the release catalog if it is not local.
    #[clap(short, long)]
    pub remote: bool,
}

/// Executes the use command.
///
/// # Errors
///
/// Returns `NotFound` if the version is not available locally and
/// `--remote` was not given, or any install error with `--remote`.
pub async fn execute(args: &UseArgs, config: &Config, force: bool) -> Result<()> {
    let tag = tag_arg(&args.tag)?;
    let manager = VersionManager::new(config, force)?;
    let platform = Platform::detect()?;

    let activation = match manager.use_local(&tag, platform, &config.base_url).await {
        Ok(activation) => activation,
        Err(SvError::NotFound { .. }) if args.remote => {
            let package = resolve_package(config, &tag).await?;
            println!("Installing {tag}...");
            manager.install(&package).await?
        }
        Err(e @ SvError::NotFound { .. }) => {
            eprintln!("Run 'sv use {tag} --remote' to install it.");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    report_activation(&tag, &activation);
    Ok(())
}
