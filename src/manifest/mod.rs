//! Manifest (`pinsync.toml`) loading.
//!
//! The manifest declares package indexes and abstract requirements per
//! category:
//!
//! ```toml
//! [[index]]
//! name = "main"
//! url = "file:///srv/index"
//! verify_ssl = true
//!
//! [packages]
//! requests = "*"
//! six = { version = ">=1.16", index = "main" }
//!
//! [dev-packages]
//! pytest = "^7"
//! ```
//!
//! The first declared index is the primary index. This module only turns the
//! document into [`Requirement`]s; it never resolves anything.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::checksum;
use crate::core::{Category, PinsyncError, is_valid_name, normalize_name};
use crate::index::IndexSource;
use crate::version::VersionConstraint;

/// Parsed project manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Declared indexes in declaration order
    #[serde(default, rename = "index", skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSource>,

    /// Runtime requirements (category `default`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub packages: BTreeMap<String, RequirementSpec>,

    /// Development requirements (category `develop`)
    #[serde(default, rename = "dev-packages", skip_serializing_if = "BTreeMap::is_empty")]
    pub dev_packages: BTreeMap<String, RequirementSpec>,
}

/// A requirement as written: either a bare constraint or a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequirementSpec {
    /// `name = ">=1.0"`
    Simple(String),
    /// `name = { version = ">=1.0", index = "main" }`
    Detailed(DetailedRequirement),
}

/// Table form of a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedRequirement {
    /// Version constraint, `*` when omitted
    #[serde(default = "any_version")]
    pub version: String,
    /// Index that must provide the package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

fn any_version() -> String {
    "*".to_string()
}

impl RequirementSpec {
    /// The constraint string.
    #[must_use]
    pub fn version(&self) -> &str {
        match self {
            Self::Simple(v) => v,
            Self::Detailed(d) => &d.version,
        }
    }

    /// The explicit index, if any.
    #[must_use]
    pub fn index(&self) -> Option<&str> {
        match self {
            Self::Simple(_) => None,
            Self::Detailed(d) => d.index.as_deref(),
        }
    }
}

/// A validated requirement, input to resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Normalized package name
    pub name: String,
    /// Parsed version constraint
    pub constraint: VersionConstraint,
    /// Explicit source index
    pub index: Option<String>,
}

#[derive(Serialize)]
struct CanonicalManifest<'a> {
    index: &'a [IndexSource],
    categories: BTreeMap<&'static str, BTreeMap<String, (String, String)>>,
}

impl Manifest {
    /// Read and parse a manifest.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PinsyncError::ManifestNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content, path)
    }

    /// Parse manifest content; `path` is used for error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            PinsyncError::ManifestParseError {
                file: path.display().to_string(),
                reason: e.message().to_string(),
            }
            .into()
        })
    }

    fn specs(&self, category: Category) -> &BTreeMap<String, RequirementSpec> {
        match category {
            Category::Default => &self.packages,
            Category::Develop => &self.dev_packages,
        }
    }

    /// Whether the category declares no requirements.
    #[must_use]
    pub fn is_empty(&self, category: Category) -> bool {
        self.specs(category).is_empty()
    }

    /// Requirements of one category in canonical (normalized name) order.
    pub fn requirements(&self, category: Category) -> Result<Vec<Requirement>, PinsyncError> {
        let mut seen = BTreeMap::new();
        for (raw_name, spec) in self.specs(category) {
            if !is_valid_name(raw_name) {
                return Err(PinsyncError::ManifestValidationError {
                    reason: format!("'{raw_name}' is not a valid package name"),
                });
            }
            let name = normalize_name(raw_name);
            let requirement = Requirement {
                name: name.clone(),
                constraint: VersionConstraint::parse(spec.version())?,
                index: spec.index().map(str::to_string),
            };
            if seen.insert(name.clone(), requirement).is_some() {
                return Err(PinsyncError::ManifestValidationError {
                    reason: format!(
                        "package '{name}' is listed more than once in [{}]",
                        category_table(category)
                    ),
                });
            }
        }
        Ok(seen.into_values().collect())
    }

    /// Check the manifest for consistency before resolution.
    pub fn validate(&self) -> Result<(), PinsyncError> {
        let mut names = BTreeSet::new();
        for index in &self.indexes {
            if index.name.trim().is_empty() || index.url.trim().is_empty() {
                return Err(PinsyncError::ManifestValidationError {
                    reason: "every [[index]] needs a non-empty name and url".to_string(),
                });
            }
            if !names.insert(index.name.as_str()) {
                return Err(PinsyncError::ManifestValidationError {
                    reason: format!("index '{}' is declared more than once", index.name),
                });
            }
        }

        let has_requirements = Category::ALL.iter().any(|c| !self.is_empty(*c));
        if has_requirements && self.indexes.is_empty() {
            return Err(PinsyncError::ManifestValidationError {
                reason: "requirements are declared but no [[index]] is configured".to_string(),
            });
        }

        for category in Category::ALL {
            for requirement in self.requirements(category)? {
                if let Some(index) = &requirement.index
                    && !names.contains(index.as_str())
                {
                    return Err(PinsyncError::IndexNotFound {
                        name: index.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Digest of the resolution-relevant content, independent of formatting,
    /// comments and name spelling.
    pub fn content_hash(&self) -> Result<String> {
        let mut categories = BTreeMap::new();
        for category in Category::ALL {
            let entries = self
                .specs(category)
                .iter()
                .map(|(name, spec)| {
                    (
                        normalize_name(name),
                        (spec.version().trim().to_string(), spec.index().unwrap_or_default().to_string()),
                    )
                })
                .collect();
            categories.insert(category.as_str(), entries);
        }
        let canonical = toml::to_string(&CanonicalManifest {
            index: &self.indexes,
            categories,
        })
        .context("Failed to serialize manifest for hashing")?;
        Ok(checksum::compute(canonical.as_bytes()))
    }
}

const fn category_table(category: Category) -> &'static str {
    match category {
        Category::Default => "packages",
        Category::Develop => "dev-packages",
    }
}
