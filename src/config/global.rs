//! User-wide configuration (`~/.pinsync/config.toml`).
//!
//! ```toml
//! max_parallel = 8
//! index_mirror = "https://mirror.example.com/simple"
//! fail_fast = false
//! ```
//!
//! Every field is optional. A missing file is the same as an empty one.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::constants::STATE_DIR_NAME;

/// Global defaults applied when neither a CLI flag nor the environment sets a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default worker count for concurrent sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,

    /// Default replacement URL for the primary index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_mirror: Option<String>,

    /// Whether sync stops starting new installs after the first failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,
}

impl GlobalConfig {
    /// Load from `path`, or from [`Self::default_path`] when `None`.
    ///
    /// Returns the default configuration when the file does not exist.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => match Self::default_path() {
                Ok(path) => path,
                Err(e) => {
                    debug!("No global config location: {e}");
                    return Ok(Self::default());
                }
            },
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    /// `~/.pinsync/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
        Ok(home.join(STATE_DIR_NAME).join("config.toml"))
    }
}
