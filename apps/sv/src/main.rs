#![warn(clippy::pedantic)]

//! # sv, a Go toolchain version manager
//!
//! Installs Go releases side by side under `~/.sv/cache/` and switches
//! between them by repointing the `~/.sv/go` symlink. Add `~/.sv/go/bin` to
//! `PATH` once.
//!
//! ## Subcommands
//!
//! - `install` - Install a release (latest stable by default)
//! - `use` - Switch the active version
//! - `uninstall` - Remove a cached version
//! - `list` - List cached or published versions
//! - `prune` - Remove old cached versions
//! - `current` - Print the active version
//! - `where` - Print the cache path of a version
//! - `latest` - Print the latest stable release
//! - `outdated` - Check for a newer stable release
//!
//! ## Examples
//!
//! ```bash
//! sv install
//! sv use 1.21.7 --remote
//! sv prune --keep 2
//! ```

mod commands;
mod config;
mod errors;
mod toolchain;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{current, install, latest, list, outdated, prune, uninstall, use_cmd, where_cmd};
use config::Config;
use errors::{Severity, SvError};
use toolchain::SvPaths;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SV_GIT_COMMIT"), ")");

/// Go toolchain version manager.
#[derive(Parser)]
#[command(
    name = "sv",
    author,
    version = VERSION,
    about = "Install and switch between Go toolchain versions",
    after_help = "\
ENVIRONMENT VARIABLES:
    SV_HOME                 Home directory (default: ~/.sv)
    SV_BASE_URL             Download and release list server (default: https://go.dev)
    SV_HTTP_TIMEOUT         Probe and release list timeout (default: 10s)
    SV_DOWNLOAD_RETRY       Download attempts (default: 3)
    SV_CONCURRENCY          Parallel download parts (default: CPU count)
    SV_DEBUG                Enable debug logging
    RUST_LOG                Log filter, overrides SV_DEBUG"
)]
pub struct Cli {
    /// Download again and replace cached files.
    #[clap(long, global = true, action = clap::ArgAction::SetTrue)]
    pub force: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the sv CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// List cached versions, or published releases with --remote.
    #[command(aliases = ["l", "ls"])]
    List(list::ListArgs),

    /// Switch the active version.
    ///
    /// Uses a cached version or a downloaded archive. With --remote, a
    /// missing version is installed first.
    Use(use_cmd::UseArgs),

    /// Install a release and make it active.
    ///
    /// Downloads in parallel parts when the server supports ranges, resumes
    /// interrupted downloads and verifies the published checksum.
    #[command(alias = "i")]
    Install(install::InstallArgs),

    /// Remove a cached version and its archives.
    #[command(alias = "ui")]
    Uninstall(uninstall::UninstallArgs),

    /// Remove old cached versions.
    Prune(prune::PruneArgs),

    /// Print the active version.
    #[command(alias = "c")]
    Current,

    /// Print the cache path of a version.
    Where(where_cmd::WhereArgs),

    /// Print the latest stable release.
    Latest,

    /// Check whether a newer stable release exists.
    Outdated,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Handles an error and returns the appropriate exit code.
///
/// Informational outcomes such as "nothing to prune" are printed to stdout
/// and exit with 0. Everything else is printed to stderr and exits with 1.
fn handle_error(e: &anyhow::Error) -> i32 {
    if let Some(sv_error) = e.downcast_ref::<SvError>()
        && sv_error.severity() == Severity::Info
    {
        println!("{sv_error}");
        return 0;
    }
    eprintln!("Error: {e:?}");
    1
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(config.debug);
    tracing::debug!(?config, "loaded configuration");

    SvPaths::from_config(&config).ensure_directories()?;

    match cli.command {
        Commands::List(args) => list::execute(&args, &config).await,
        Commands::Use(args) => use_cmd::execute(&args, &config, cli.force).await,
        Commands::Install(args) => install::execute(&args, &config, cli.force).await,
        Commands::Uninstall(args) => uninstall::execute(&args, &config),
        Commands::Prune(args) => prune::execute(&args, &config),
        Commands::Current => current::execute(&config),
        Commands::Where(args) => where_cmd::execute(&args, &config),
        Commands::Latest => latest::execute(&config).await,
        Commands::Outdated => outdated::execute(&config).await,
    }
}
