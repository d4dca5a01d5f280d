//! Install records (`<target>/<name>-<version>.pinsync-info/RECORD`).
//!
//! A record lists every file a package placed in the target together with the
//! hash of the artifact it came from. It is what makes a repeated sync a
//! no-op and lets an upgrade remove files the new version no longer ships.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::RECORD_DIR_SUFFIX;
use crate::utils::fs::{atomic_write, remove_dir_if_exists, remove_file_if_exists};

/// File name of the record inside the record directory.
pub const RECORD_FILE: &str = "RECORD";

/// One installed file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Path relative to the target, `/`-separated
    pub path: String,
    /// `sha256:<hex>` of the file content
    pub hash: String,
}

/// Everything pinsync knows about one installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRecord {
    /// Normalized package name
    pub name: String,
    /// Installed version
    pub version: String,
    /// Hash of the artifact the files were extracted from
    pub artifact_hash: String,
    /// Installed files, sorted by path
    #[serde(default, rename = "file")]
    pub files: Vec<RecordEntry>,
}

impl InstallRecord {
    /// Record directory for `name` and `version` under `target`.
    #[must_use]
    pub fn dir(target: &Path, name: &str, version: &str) -> PathBuf {
        target.join(format!("{name}-{version}.{RECORD_DIR_SUFFIX}"))
    }

    /// Find the record of any installed version of `name`.
    ///
    /// Unreadable records are ignored with a warning; the package is then
    /// simply reinstalled.
    pub fn find(target: &Path, name: &str) -> Result<Option<(PathBuf, Self)>> {
        let entries = match std::fs::read_dir(target) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read install target: {}", target.display()));
            }
        };

        let prefix = format!("{name}-");
        let suffix = format!(".{RECORD_DIR_SUFFIX}");
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !file_name.starts_with(&prefix) || !file_name.ends_with(&suffix) {
                continue;
            }
            let record_path = entry.path().join(RECORD_FILE);
            let record = match std::fs::read_to_string(&record_path)
                .map_err(anyhow::Error::from)
                .and_then(|c| toml::from_str::<Self>(&c).map_err(anyhow::Error::from))
            {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %record_path.display(), error = %e, "Ignoring unreadable install record");
                    continue;
                }
            };
            if record.name == name {
                return Ok(Some((entry.path(), record)));
            }
        }
        Ok(None)
    }

    /// Whether every recorded file is still present.
    #[must_use]
    pub fn files_present(&self, target: &Path) -> bool {
        self.files.iter().all(|f| target.join(&f.path).is_file())
    }

    /// Write the record atomically.
    pub fn write(&self, target: &Path) -> Result<PathBuf> {
        let dir = Self::dir(target, &self.name, &self.version);
        let content = toml::to_string(self).context("Failed to serialize install record")?;
        atomic_write(&dir.join(RECORD_FILE), content.as_bytes())?;
        Ok(dir)
    }

    /// Remove files of this (previous) record that `current` does not ship,
    /// then drop this record's directory unless `current` reuses it.
    pub fn remove_stale(&self, record_dir: &Path, target: &Path, current: &Self) -> Result<()> {
        for file in &self.files {
            if current.files.binary_search_by(|f| f.path.cmp(&file.path)).is_err() {
                debug!(package = %self.name, path = %file.path, "Removing stale file");
                remove_file_if_exists(&target.join(&file.path))?;
            }
        }
        if record_dir != Self::dir(target, &current.name, &current.version) {
            remove_dir_if_exists(record_dir)?;
        }
        Ok(())
    }
}
