//! Loading and saving the lock artifact.
//!
//! Saving goes through [`atomic_write`]: either the complete new artifact is
//! visible afterwards or the previous one is left untouched.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::LockFile;
use crate::core::{PinsyncError, is_valid_name, normalize_name};
use crate::utils::fs::atomic_write;
use crate::version::parse_version;

impl LockFile {
    /// Load a lock artifact.
    ///
    /// A missing file is [`PinsyncError::LockfileNotFound`], never an empty
    /// artifact: sync must not proceed without one.
    pub fn load(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PinsyncError::LockfileNotFound {
                    file: file_name,
                }
                .into());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Cannot read lockfile: {}", path.display()));
            }
        };

        let lockfile: Self = toml::from_str(&content).map_err(|e| PinsyncError::LockfileParseError {
            file: path.display().to_string(),
            reason: e.message().to_string(),
        })?;

        if lockfile.version > Self::CURRENT_VERSION {
            return Err(PinsyncError::LockfileVersionUnsupported {
                found: lockfile.version,
                supported: Self::CURRENT_VERSION,
            }
            .into());
        }

        lockfile.check_entries(path)?;
        Ok(lockfile)
    }

    /// Reject entries that could not have been written by `lock`.
    ///
    /// Names and versions end up in install paths, so they are validated
    /// before anything touches the filesystem.
    fn check_entries(&self, path: &Path) -> Result<(), PinsyncError> {
        let invalid = |reason: String| PinsyncError::LockfileParseError {
            file: path.display().to_string(),
            reason,
        };

        for (category, packages) in &self.categories {
            if category.parse::<crate::core::Category>().is_err() {
                return Err(invalid(format!("unknown category '{category}'")));
            }
            for (name, package) in packages {
                if !is_valid_name(name) || normalize_name(name) != *name {
                    return Err(invalid(format!("'{name}' is not a normalized package name")));
                }
                if parse_version(&package.version).is_err() {
                    return Err(invalid(format!(
                        "package '{name}' has invalid version '{}'",
                        package.version
                    )));
                }
            }
        }
        Ok(())
    }

    /// Write the artifact atomically.
    ///
    /// Returns `false` when the file already contained identical bytes and
    /// nothing was written.
    pub fn save(&self, path: &Path) -> Result<bool> {
        let content = self.to_toml_string().context("Failed to serialize lockfile")?;

        if let Ok(existing) = fs::read(path)
            && existing == content.as_bytes()
        {
            debug!(path = %path.display(), "Lockfile unchanged, skipping write");
            return Ok(false);
        }

        atomic_write(path, content.as_bytes())
            .with_context(|| format!("Cannot write lockfile: {}", path.display()))?;
        Ok(true)
    }
}
