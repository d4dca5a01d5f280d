//! Command-line interface for pinsync.
//!
//! Two subcommands make up the whole surface:
//!
//! - `pinsync lock` resolves `pinsync.toml` into `pinsync.lock`
//! - `pinsync sync` installs exactly what `pinsync.lock` records
//!
//! Global flags control verbosity, progress output and where the manifest
//! and global configuration live. The process environment is read once per
//! invocation into an [`EnvOverrides`] snapshot, which is then handed to the
//! commands as a plain value.
//!
//! ```bash
//! pinsync lock
//! pinsync --verbose sync --sequential
//! PINSYNC_TARGET=/opt/app/lib pinsync sync --dev
//! ```

mod lock;
mod sync;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{EnvOverrides, GlobalConfig, first_set};

pub use lock::LockCommand;
pub use sync::SyncCommand;

/// How much the CLI prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Progress and summaries
    #[default]
    Normal,
    /// Per-package lines and debug logs
    Verbose,
}

/// Settings shared by every subcommand, derived from global flags and the
/// environment snapshot.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Output level
    pub verbosity: Verbosity,
    /// Whether progress bars are drawn
    pub progress: bool,
    /// Global configuration file, if one was named explicitly
    pub config_path: Option<PathBuf>,
    /// Explicit manifest location
    pub manifest_path: Option<PathBuf>,
    /// Environment snapshot for this invocation
    pub env: EnvOverrides,
}

impl CliConfig {
    /// Install the global `tracing` subscriber.
    ///
    /// `RUST_LOG` wins in normal mode; `--verbose` and `--quiet` always
    /// override it. Logs go to stderr so stdout carries only report lines.
    /// An already installed subscriber (an embedder's, or one from an earlier
    /// call) is kept.
    pub fn init_logging(&self) {
        let filter = match self.verbosity {
            Verbosity::Verbose => EnvFilter::new("pinsync=debug,warn"),
            Verbosity::Quiet => EnvFilter::new("error"),
            Verbosity::Normal => {
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pinsync=info,warn"))
            }
        };

        if let Err(e) = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
        {
            tracing::debug!(error = %e, "Keeping existing tracing subscriber");
        }
    }

    /// Load the global configuration (`--config` > `PINSYNC_CONFIG` > default location).
    pub async fn load_global(&self) -> Result<GlobalConfig> {
        let path = first_set(self.config_path.clone(), self.env.config_path.clone(), None);
        GlobalConfig::load_with_optional(path).await
    }
}

/// Deterministic lock-and-sync for project dependencies.
#[derive(Parser)]
#[command(
    name = "pinsync",
    about = "Lock dependencies deterministically and sync them with verified hashes",
    version,
    long_about = "pinsync resolves the requirements in pinsync.toml into an exact, hash-pinned \
                  pinsync.lock, and installs strictly from that lock artifact."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show per-package results and debug logs
    ///
    /// Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the global configuration file
    ///
    /// Defaults to `$PINSYNC_CONFIG`, then `~/.pinsync/config.toml`.
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Path to pinsync.toml
    ///
    /// By default the current directory and its parents are searched.
    #[arg(long, global = true, value_name = "PATH")]
    manifest_path: Option<PathBuf>,

    /// Disable progress bars (also `PINSYNC_NO_PROGRESS=1`)
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve pinsync.toml and write pinsync.lock
    Lock(LockCommand),

    /// Install the packages recorded in pinsync.lock
    Sync(SyncCommand),
}

impl Cli {
    /// Snapshot the environment, set up logging and run the subcommand.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config(EnvOverrides::from_env());
        config.init_logging();
        self.execute_with_config(config).await
    }

    /// Derive the shared settings from the parsed flags and an environment snapshot.
    #[must_use]
    pub fn build_config(&self, env: EnvOverrides) -> CliConfig {
        let verbosity = if self.verbose {
            Verbosity::Verbose
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        };

        CliConfig {
            verbosity,
            progress: verbosity == Verbosity::Normal && !self.no_progress && !env.no_progress,
            config_path: self.config.clone(),
            manifest_path: self.manifest_path.clone(),
            env,
        }
    }

    /// Run the subcommand with explicit settings.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Lock(cmd) => cmd.execute(&config).await,
            Commands::Sync(cmd) => cmd.execute(&config).await,
        }
    }
}
