//! `pinsync lock`: resolve the manifest into the lock artifact.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{CliConfig, Verbosity};
use crate::config::first_set;
use crate::project::{LockOptions, Project};

/// Resolve pinsync.toml and write pinsync.lock.
///
/// The lock artifact is only replaced when resolution succeeds, and only
/// rewritten when its content changes.
#[derive(Args, Debug, Default)]
pub struct LockCommand {
    /// Fetch from this URL instead of the primary index
    ///
    /// The lock artifact still records the declared index URL.
    #[arg(long, value_name = "URL")]
    index_mirror: Option<String>,
}

impl LockCommand {
    /// Run the command.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let global = config.load_global().await?;
        let project = Project::discover(config.manifest_path.as_deref())?;

        let options = LockOptions {
            index_mirror: first_set(self.index_mirror, config.env.index_mirror.clone(), global.index_mirror),
        };
        let outcome = project.lock(&options).await?;

        if config.verbosity != Verbosity::Quiet {
            let status = if outcome.written { "Locked" } else { "Up to date" };
            println!(
                "{} {} packages in {}",
                status.green().bold(),
                outcome.lockfile.package_count(),
                outcome.path.display()
            );
        }
        Ok(())
    }
}
