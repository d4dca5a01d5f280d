//! Per-package release metadata (`<index>/<name>/index.toml`).
//!
//! ```toml
//! [[release]]
//! version = "2.31.0"
//! requires = { idna = ">=2.5, <4", certifi = "*" }
//!
//! [[release.artifact]]
//! filename = "requests-2.31.0.zip"
//! sha256 = "58cd2187c01e70e6e26505bca751777aa9f2ee0b7f4300988b709f44e013003f"
//! ```
//!
//! `sha256` is optional for local indexes, which hash the artifact bytes
//! themselves.

use anyhow::{Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::core::{PinsyncError, is_valid_name, normalize_name};
use crate::version::{VersionConstraint, parse_version};

/// Raw metadata document as stored on an index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Every published release of the package
    #[serde(default, rename = "release")]
    pub releases: Vec<ReleaseEntry>,
}

/// One `[[release]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseEntry {
    /// Version string
    pub version: String,
    /// Direct dependencies: package name → constraint
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requires: BTreeMap<String, String>,
    /// Downloadable archives of this release
    #[serde(default, rename = "artifact", skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ArtifactEntry>,
}

/// One `[[release.artifact]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// File name, relative to the package directory on the index
    pub filename: String,
    /// Hex SHA-256 of the file, when the index publishes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// A parsed, validated release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Exact version
    pub version: Version,
    /// Direct dependencies keyed by normalized name
    pub requires: BTreeMap<String, VersionConstraint>,
    /// Artifacts, sorted by file name
    pub artifacts: Vec<Artifact>,
}

/// A downloadable archive of a release.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Artifact {
    /// File name on the index
    pub filename: String,
    /// `sha256:<hex>` digest
    pub hash: String,
}

impl PackageMetadata {
    /// Parse the TOML document.
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| format!("Invalid index metadata in {origin}"))
    }
}

impl ReleaseEntry {
    /// Validate this entry into a [`Release`], given resolved artifact hashes.
    ///
    /// Returns `Ok(None)` (with a warning) for entries whose version does
    /// not parse, so one bad entry does not hide the rest of the package.
    pub fn to_release(&self, package: &str, artifacts: Vec<Artifact>) -> Result<Option<Release>> {
        let version = match parse_version(&self.version) {
            Ok(v) => v,
            Err(e) => {
                warn!(package, version = %self.version, error = %e, "Skipping release with invalid version");
                return Ok(None);
            }
        };

        let mut requires = BTreeMap::new();
        for (dep, constraint) in &self.requires {
            if !is_valid_name(dep) {
                return Err(PinsyncError::Other {
                    message: format!("Release {package} {version} requires invalid package name '{dep}'"),
                }
                .into());
            }
            let parsed = VersionConstraint::parse(constraint)
                .with_context(|| format!("In requirements of {package} {version}"))?;
            requires.insert(normalize_name(dep), parsed);
        }

        let mut artifacts = artifacts;
        artifacts.sort();

        Ok(Some(Release {
            version,
            requires,
            artifacts,
        }))
    }
}

/// Whether an artifact file name is a plain file name (no path components).
#[must_use]
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename != "."
        && filename != ".."
        && !filename.contains(['/', '\\'])
}
