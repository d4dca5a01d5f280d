//! The lock artifact (`pinsync.lock`).
//!
//! The lock artifact is the single source of truth for `sync`. It is produced
//! whole by `lock` and never patched in place:
//!
//! ```toml
//! # Auto-generated lockfile - DO NOT EDIT
//! version = 1
//!
//! [meta]
//! manifest-hash = "sha256:..."
//!
//! [[meta.index]]
//! name = "main"
//! url = "file:///srv/index"
//! verify_ssl = true
//!
//! [categories.default.requests]
//! version = "2.31.0"
//! hashes = ["sha256:..."]
//! index = "main"
//! dependencies = ["certifi", "idna"]
//! ```
//!
//! # Determinism
//!
//! Every collection is ordered (`BTreeMap`, sorted vectors) and nothing
//! host- or time-dependent is stored, so serializing equal values always
//! yields identical bytes. [`LockFile::save`] additionally skips the write
//! when the file on disk already has those bytes.

pub mod io;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::Category;
use crate::index::IndexSource;
use crate::manifest::Manifest;

/// Header written above the TOML body.
pub const LOCKFILE_HEADER: &str = "# Auto-generated lockfile - DO NOT EDIT\n";

/// A complete lock artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    /// Format version
    pub version: u32,

    /// Provenance: manifest digest and declared indexes
    #[serde(default)]
    pub meta: LockMeta,

    /// Category name → normalized package name → pin
    #[serde(default)]
    pub categories: BTreeMap<String, BTreeMap<String, LockedPackage>>,
}

/// Lock artifact metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMeta {
    /// Digest of the manifest content this artifact was resolved from
    #[serde(rename = "manifest-hash", default, skip_serializing_if = "Option::is_none")]
    pub manifest_hash: Option<String>,

    /// Indexes as declared in the manifest (never a mirror URL)
    #[serde(rename = "index", default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSource>,
}

/// One pinned package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPackage {
    /// Exact version
    pub version: String,
    /// Acceptable artifact hashes, sorted and unique
    pub hashes: Vec<String>,
    /// Name of the index the package was resolved from
    pub index: String,
    /// Normalized names of direct dependencies, sorted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl Default for LockFile {
    fn default() -> Self {
        Self::new()
    }
}

impl LockFile {
    /// Highest format version this build reads and the one it writes.
    pub const CURRENT_VERSION: u32 = 1;

    /// Empty lock artifact with both categories present.
    #[must_use]
    pub fn new() -> Self {
        let categories =
            Category::ALL.iter().map(|c| (c.as_str().to_string(), BTreeMap::new())).collect();
        Self {
            version: Self::CURRENT_VERSION,
            meta: LockMeta::default(),
            categories,
        }
    }

    /// Packages of one category, if present.
    #[must_use]
    pub fn category(&self, category: Category) -> Option<&BTreeMap<String, LockedPackage>> {
        self.categories.get(category.as_str())
    }

    /// Mutable access to a category, created on demand.
    pub fn category_mut(&mut self, category: Category) -> &mut BTreeMap<String, LockedPackage> {
        self.categories.entry(category.as_str().to_string()).or_default()
    }

    /// Total number of pins across all categories.
    #[must_use]
    pub fn package_count(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    /// Whether the manifest changed since this artifact was resolved.
    ///
    /// An artifact without a recorded manifest hash is always stale.
    pub fn is_stale(&self, manifest: &Manifest) -> Result<bool> {
        let current = manifest.content_hash()?;
        Ok(self.meta.manifest_hash.as_deref() != Some(current.as_str()))
    }

    /// Serialize to the on-disk representation (header + TOML).
    pub fn to_toml_string(&self) -> Result<String> {
        let body = toml::to_string(self)?;
        Ok(format!("{LOCKFILE_HEADER}{body}"))
    }
}

impl LockedPackage {
    /// Build a pin, normalizing hash and dependency order.
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        hashes: impl IntoIterator<Item = String>,
        index: impl Into<String>,
        dependencies: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut hashes: Vec<String> = hashes.into_iter().collect();
        hashes.sort();
        hashes.dedup();
        let mut dependencies: Vec<String> = dependencies.into_iter().collect();
        dependencies.sort();
        dependencies.dedup();
        Self {
            version: version.into(),
            hashes,
            index: index.into(),
            dependencies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn sample() -> LockFile {
        let mut lock = LockFile::new();
        lock.meta.manifest_hash = Some("sha256:abc".into());
        lock.meta.indexes.push(IndexSource::new("main", "file:///srv/index"));
        lock.category_mut(Category::Default).insert(
            "requests".into(),
            LockedPackage::new(
                "2.31.0",
                ["sha256:bb".to_string(), "sha256:aa".to_string(), "sha256:bb".to_string()],
                "main",
                ["idna".to_string(), "certifi".to_string()],
            ),
        );
        lock.category_mut(Category::Default)
            .insert("certifi".into(), LockedPackage::new("2024.2.2", ["sha256:cc".to_string()], "main", []));
        lock
    }

    #[test]
    fn test_locked_package_sorts_and_dedups() {
        let lock = sample();
        let requests = &lock.category(Category::Default).unwrap()["requests"];
        assert_eq!(requests.hashes, vec!["sha256:aa", "sha256:bb"]);
        assert_eq!(requests.dependencies, vec!["certifi", "idna"]);
    }

    #[test]
    fn test_serialization_is_canonical() {
        let content = sample().to_toml_string().unwrap();
        assert!(content.starts_with(LOCKFILE_HEADER));
        assert!(content.contains("version = 1"));
        assert!(content.contains("manifest-hash = \"sha256:abc\""));
        let certifi = content.find("[categories.default.certifi]").unwrap();
        let requests = content.find("[categories.default.requests]").unwrap();
        assert!(certifi < requests);
    }

    #[test]
    fn test_is_stale() {
        let manifest = Manifest::parse(
            "[[index]]\nname = \"main\"\nurl = \"idx\"\n[packages]\nsix = \"*\"\n",
            Path::new("pinsync.toml"),
        )
        .unwrap();
        let mut lock = LockFile::new();
        assert!(lock.is_stale(&manifest).unwrap());
        lock.meta.manifest_hash = Some(manifest.content_hash().unwrap());
        assert!(!lock.is_stale(&manifest).unwrap());
    }
}
