//! Dependency resolution.
//!
//! Turns manifest requirements into a [`LockFile`] in two phases:
//!
//! 1. **Metadata collection** (I/O): breadth-first over package names,
//!    starting at the requirements of every category and following the
//!    dependencies of every release. Each name is looked up once.
//! 2. **Selection** (pure): [`solver::Solver`] picks one release per package.
//!    The `default` category is solved first; `develop` is solved afterwards
//!    with every default pin fixed, so shared packages get one version.
//!
//! Category membership is the closure of the category's requirements over
//! the pinned dependency graph ([`dependency_graph::DependencyGraph`]).
//!
//! For fixed requirements and fixed index content the output is identical on
//! every run: lookups are keyed by name and all collections are ordered.

pub mod dependency_graph;
pub mod solver;

pub use dependency_graph::DependencyGraph;
pub use solver::{Catalog, CatalogEntry, Solver};

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use semver::Version;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::constants::METADATA_FETCH_CONCURRENCY;
use crate::core::{Category, PinsyncError};
use crate::index::{IndexSet, Release};
use crate::lockfile::{LockFile, LockedPackage};
use crate::manifest::{Manifest, Requirement};

/// Resolves a manifest against a set of indexes.
pub struct Resolver<'a> {
    indexes: &'a IndexSet,
}

impl<'a> Resolver<'a> {
    /// Create a resolver reading from `indexes`.
    #[must_use]
    pub const fn new(indexes: &'a IndexSet) -> Self {
        Self {
            indexes,
        }
    }

    /// Resolve every category of `manifest` into a complete lock artifact.
    ///
    /// Fails without producing anything when a requirement cannot be
    /// satisfied or an index cannot be read.
    pub async fn resolve(&self, manifest: &Manifest) -> Result<LockFile> {
        let mut requirements = BTreeMap::new();
        for category in Category::ALL {
            requirements.insert(category, manifest.requirements(category)?);
        }

        let catalog = self.collect_metadata(requirements.values().flatten()).await?;

        let mut lockfile = LockFile::new();
        lockfile.meta.manifest_hash = Some(manifest.content_hash()?);
        lockfile.meta.indexes = self.indexes.sources();

        let mut pins: BTreeMap<String, Release> = BTreeMap::new();
        for category in Category::ALL {
            let fixed: BTreeMap<String, Version> =
                pins.iter().map(|(name, release)| (name.clone(), release.version.clone())).collect();
            let roots = &requirements[&category];
            let solution = Solver::new(&catalog, &fixed).solve(roots, &root_label(category))?;
            debug!(%category, packages = solution.len(), "Solved category");
            pins.extend(solution);
        }

        let mut graph = DependencyGraph::new();
        for (name, release) in &pins {
            graph.add_package(name);
            for dep in release.requires.keys() {
                graph.add_dependency(name, dep);
            }
        }

        for category in Category::ALL {
            let members = graph.closure(requirements[&category].iter().map(|r| r.name.as_str()));
            let packages = lockfile.category_mut(category);
            for name in members {
                let (Some(release), Some(entry)) = (pins.get(&name), catalog.get(&name)) else {
                    continue;
                };
                packages.insert(
                    name.clone(),
                    LockedPackage::new(
                        release.version.to_string(),
                        release.artifacts.iter().map(|a| a.hash.clone()),
                        entry.index.clone(),
                        release.requires.keys().cloned(),
                    ),
                );
            }
        }

        info!(packages = lockfile.package_count(), "Resolved dependencies");
        Ok(lockfile)
    }

    /// Phase 1: fetch the release list of every reachable package.
    ///
    /// Requirements may name an explicit index; transitive dependencies are
    /// looked up in declaration order. A requirement no index provides is an
    /// error here, a transitive one only if the solver ends up needing it.
    async fn collect_metadata<'r>(&self, roots: impl Iterator<Item = &'r Requirement>) -> Result<Catalog> {
        let mut explicit: BTreeMap<String, Option<String>> = BTreeMap::new();
        for requirement in roots {
            let slot = explicit.entry(requirement.name.clone()).or_insert(None);
            if slot.is_none() {
                slot.clone_from(&requirement.index);
            }
        }

        let mut catalog = Catalog::new();
        let mut seen: BTreeSet<String> = explicit.keys().cloned().collect();
        let mut layer: Vec<String> = seen.iter().cloned().collect();

        while !layer.is_empty() {
            debug!(count = layer.len(), "Fetching release metadata");
            let results: Vec<(String, Result<(String, Vec<Release>)>)> = stream::iter(layer.iter().cloned())
                .map(|name| {
                    let index = explicit.get(&name).cloned().flatten();
                    async move {
                        let result = self.indexes.find_releases(&name, index.as_deref()).await;
                        (name, result)
                    }
                })
                .buffer_unordered(METADATA_FETCH_CONCURRENCY)
                .collect()
                .await;

            let mut next = BTreeSet::new();
            for (name, result) in results {
                let (index, releases) = match result {
                    Ok(found) => found,
                    Err(e)
                        if !explicit.contains_key(&name)
                            && matches!(
                                e.downcast_ref::<PinsyncError>(),
                                Some(PinsyncError::PackageNotFound { .. })
                            ) =>
                    {
                        debug!(package = %name, "Transitive dependency not found on any index");
                        continue;
                    }
                    Err(e) => {
                        return Err(e).with_context(|| format!("Failed to look up package '{name}'"));
                    }
                };
                for release in &releases {
                    for dep in release.requires.keys() {
                        if seen.insert(dep.clone()) {
                            next.insert(dep.clone());
                        }
                    }
                }
                catalog.insert(name, index, releases);
            }
            layer = next.into_iter().collect();
        }

        Ok(catalog)
    }
}

fn root_label(category: Category) -> String {
    match category {
        Category::Default => "[packages]".to_string(),
        Category::Develop => "[dev-packages]".to_string(),
    }
}
