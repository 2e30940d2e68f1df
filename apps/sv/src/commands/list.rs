//! List command for the sv CLI.
//!
//! ## Usage
//!
//! ```bash
//! sv list        # Cached versions
//! sv ls --remote # Every published release
//! ```
//!
//! ## Output Format
//!
//! ```text
//! * go1.22.0
//!   go1.21.7
//! ```

use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::errors::SvError;
use crate::toolchain::catalog::sorted_tags;
use crate::toolchain::{CatalogClient, SvPaths, VersionManager};

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// List releases from the catalog instead of cached versions.
    #[clap(short, long)]
    pub remote: bool,
}

/// Executes the list command.
///
/// The active version is marked with an asterisk.
///
/// # Errors
///
/// Returns `NoLocalVersions` when nothing is cached, or a catalog error for
/// `--remote`.
pub async fn execute(args: &ListArgs, config: &Config) -> Result<()> {
    let manager = VersionManager::new(config, false)?;
    if args.remote {
        return list_remote(config, manager.paths(), manager.active()?.as_deref()).await;
    }

    let installed = manager.installed()?;
    if installed.is_empty() {
        return Err(SvError::NoLocalVersions.into());
    }
    for version in &installed {
        let marker = if version.active { "*" } else { " " };
        println!("{marker} {}", version.tag);
    }
    Ok(())
}

async fn list_remote(config: &Config, paths: &SvPaths, active: Option<&str>) -> Result<()> {
    let releases = CatalogClient::new(config)?.releases(true).await?;
    for tag in sorted_tags(&releases) {
        let marker = if active == Some(tag.as_str()) { "*" } else { " " };
        if paths.is_cached(&tag) {
            println!("{marker} {tag}    (installed)");
        } else {
            println!("{marker} {tag}");
        }
    }
    Ok(())
}
