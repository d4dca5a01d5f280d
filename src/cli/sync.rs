//! `pinsync sync`: install from the lock artifact.
//!
//! Sync never resolves and never writes `pinsync.lock`. A missing lock
//! artifact is a hard error; a lock artifact older than the manifest only
//! produces a warning.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{CliConfig, Verbosity};
use crate::config::first_set;
use crate::constants::default_max_parallel;
use crate::core::Category;
use crate::installer::{InstallMode, InstallOptions, InstallResult};
use crate::project::{Project, SyncOptions};

/// Install the packages recorded in pinsync.lock.
#[derive(Args, Debug, Default)]
pub struct SyncCommand {
    /// Install one package at a time, in lock order
    #[arg(long)]
    sequential: bool,

    /// Also install the develop category
    #[arg(long)]
    dev: bool,

    /// Keep installing remaining packages after a failure
    #[arg(long)]
    keep_going: bool,

    /// Maximum concurrent installs (ignored with --sequential)
    #[arg(long, value_name = "NUM", value_parser = clap::value_parser!(u16).range(1..))]
    max_parallel: Option<u16>,

    /// Fetch from this URL instead of the primary index
    #[arg(long, value_name = "URL")]
    index_mirror: Option<String>,
}

impl SyncCommand {
    /// Run the command.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let global = config.load_global().await?;
        let project = Project::discover(config.manifest_path.as_deref())?;

        let mode = if self.sequential {
            InstallMode::Sequential
        } else {
            InstallMode::Concurrent {
                max_parallel: first_set(self.max_parallel.map(usize::from), None, global.max_parallel)
                    .unwrap_or_else(default_max_parallel),
            }
        };
        let fail_fast = if self.keep_going { false } else { global.fail_fast.unwrap_or(true) };

        let mut categories = vec![Category::Default];
        if self.dev {
            categories.push(Category::Develop);
        }

        let options = SyncOptions {
            categories,
            install: InstallOptions {
                mode,
                fail_fast,
            },
            index_mirror: first_set(self.index_mirror, config.env.index_mirror.clone(), global.index_mirror),
            env: config.env.clone(),
            progress: config.progress,
        };

        let verbose = config.verbosity == Verbosity::Verbose;
        let report_line = move |result: &InstallResult| {
            if result.is_failure() {
                eprintln!("{} {result}", "error:".red().bold());
            } else if verbose {
                println!("{result}");
            }
        };

        let report = project.sync(&options, Some(&report_line)).await?;

        if config.verbosity != Verbosity::Quiet {
            println!(
                "{} {} packages ({} changed)",
                "Synced".green().bold(),
                report.results.len(),
                report.changed_count()
            );
        }
        Ok(())
    }
}
