//! Prune command for the sv CLI.
//!
//! ## Usage
//!
//! ```bash
//! sv prune              # Keep the newest version and the active one
//! sv prune --keep 3
//! sv prune --all        # Keep only the active version
//! sv prune --dry-run
//! ```

use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::toolchain::VersionManager;

/// Arguments for the prune command.
#[derive(Args)]
pub struct PruneArgs {
    /// Number of newest versions to keep.
    #[clap(short, long, default_value_t = 2)]
    pub keep: usize,

    /// Remove every version except the active one.
    #[clap(short, long)]
    pub all: bool,

    /// Show what would be removed without deleting anything.
    #[clap(long)]
    pub dry_run: bool,
}

/// Executes the prune command.
///
/// Versions that fail to delete are reported and skipped.
///
/// # Errors
///
/// Returns `NothingToPrune` when no version qualifies.
pub fn execute(args: &PruneArgs, config: &Config) -> Result<()> {
    let manager = VersionManager::new(config, false)?;
    let report = manager.prune(args.keep, args.all, args.dry_run)?;

    let verb = if report.dry_run { "Would remove" } else { "Removed" };
    for tag in &report.removed {
        println!("{verb} {tag}");
    }
    for tag in &report.failed {
        eprintln!("Failed to remove {tag}");
    }
    Ok(())
}
