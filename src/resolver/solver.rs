//! Backtracking version selection.
//!
//! Pure: works on a [`Catalog`] collected beforehand and performs no I/O.
//!
//! Packages are decided in canonical name order; for each, candidates are the
//! releases with at least one artifact that satisfy every constraint collected
//! so far, highest version first. Choosing a release adds its dependency
//! constraints. When a choice contradicts an earlier pin or leaves some
//! package without candidates, the search backs up to the most recent choice
//! and tries its next candidate.

use semver::Version;
use std::collections::BTreeMap;
use tracing::trace;

use crate::constants::MAX_RESOLUTION_ATTEMPTS;
use crate::core::PinsyncError;
use crate::index::Release;
use crate::manifest::Requirement;
use crate::version::VersionConstraint;

/// Release lists of every package reachable from the requirements.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    packages: BTreeMap<String, CatalogEntry>,
}

/// Releases of one package and the index that provided them.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Index name
    pub index: String,
    /// Releases, highest version first
    pub releases: Vec<Release>,
}

impl Catalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the releases of `name`.
    pub fn insert(&mut self, name: impl Into<String>, index: impl Into<String>, mut releases: Vec<Release>) {
        releases.sort_by(|a, b| b.version.cmp(&a.version));
        self.packages.insert(
            name.into(),
            CatalogEntry {
                index: index.into(),
                releases,
            },
        );
    }

    /// Entry for `name`, if any index knows it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.packages.get(name)
    }
}

#[derive(Debug, Clone)]
struct Demand {
    constraint: VersionConstraint,
    requirer: String,
}

#[derive(Debug, Clone, Default)]
struct State<'a> {
    pins: BTreeMap<String, &'a Release>,
    demands: BTreeMap<String, Vec<Demand>>,
}

/// One search over a catalog.
pub struct Solver<'a> {
    catalog: &'a Catalog,
    fixed: &'a BTreeMap<String, Version>,
    attempts: usize,
    exhausted: bool,
    conflict: Option<String>,
}

impl<'a> Solver<'a> {
    /// `fixed` pins versions that must not change (e.g. default pins while
    /// resolving development requirements).
    #[must_use]
    pub const fn new(catalog: &'a Catalog, fixed: &'a BTreeMap<String, Version>) -> Self {
        Self {
            catalog,
            fixed,
            attempts: 0,
            exhausted: false,
            conflict: None,
        }
    }

    /// Choose one release per reachable package.
    ///
    /// `requirer` labels the root requirements in conflict messages.
    pub fn solve(
        mut self,
        roots: &[Requirement],
        requirer: &str,
    ) -> Result<BTreeMap<String, Release>, PinsyncError> {
        let mut state = State::default();
        for root in roots {
            state.demands.entry(root.name.clone()).or_default().push(Demand {
                constraint: root.constraint.clone(),
                requirer: requirer.to_string(),
            });
        }

        match self.search(state) {
            Some(solution) => {
                Ok(solution.pins.into_iter().map(|(name, release)| (name, release.clone())).collect())
            }
            None if self.exhausted => Err(PinsyncError::DependencyResolutionFailed {
                reason: format!(
                    "gave up after trying {MAX_RESOLUTION_ATTEMPTS} candidate versions{}",
                    self.conflict.map(|c| format!("; last conflict: {c}")).unwrap_or_default()
                ),
            }),
            None => Err(PinsyncError::DependencyResolutionFailed {
                reason: self.conflict.unwrap_or_else(|| "no solution found".to_string()),
            }),
        }
    }

    fn search(&mut self, state: State<'a>) -> Option<State<'a>> {
        let Some(name) = state.demands.keys().find(|n| !state.pins.contains_key(*n)).cloned() else {
            return Some(state);
        };
        let demands = &state.demands[&name];
        let catalog: &'a Catalog = self.catalog;
        let fixed_pins: &'a BTreeMap<String, Version> = self.fixed;

        let Some(entry) = catalog.get(&name) else {
            self.conflict =
                Some(format!("no index provides '{name}' (required by {})", describe(demands)));
            return None;
        };

        let fixed = fixed_pins.get(&name);
        let candidates: Vec<&'a Release> = entry
            .releases
            .iter()
            .filter(|r| !r.artifacts.is_empty())
            .filter(|r| fixed.is_none_or(|v| *v == r.version))
            .filter(|r| demands.iter().all(|d| d.constraint.matches(&r.version)))
            .collect();

        if candidates.is_empty() {
            let available: Vec<String> = entry.releases.iter().map(|r| r.version.to_string()).collect();
            let mut message = format!(
                "no version of '{name}' satisfies {} (available: {})",
                describe(demands),
                if available.is_empty() { "none".to_string() } else { available.join(", ") }
            );
            if let Some(pinned) = fixed {
                message.push_str(&format!("; pinned to {pinned} by the default category"));
            }
            self.conflict = Some(message);
            return None;
        }

        'candidates: for release in candidates {
            self.attempts += 1;
            if self.attempts > MAX_RESOLUTION_ATTEMPTS {
                self.exhausted = true;
                return None;
            }
            trace!(package = %name, version = %release.version, "Trying candidate");

            let mut next = state.clone();
            next.pins.insert(name.clone(), release);
            let requirer = format!("{name} {}", release.version);
            for (dep, constraint) in &release.requires {
                if let Some(pinned) = next.pins.get(dep)
                    && !constraint.matches(&pinned.version)
                {
                    self.conflict = Some(format!(
                        "{requirer} requires {dep} {constraint}, but {dep} {} was already selected",
                        pinned.version
                    ));
                    continue 'candidates;
                }
                next.demands.entry(dep.clone()).or_default().push(Demand {
                    constraint: constraint.clone(),
                    requirer: requirer.clone(),
                });
            }

            if let Some(solution) = self.search(next) {
                return Some(solution);
            }
            if self.exhausted {
                return None;
            }
        }
        None
    }
}

fn describe(demands: &[Demand]) -> String {
    demands
        .iter()
        .map(|d| format!("{} (required by {})", d.constraint, d.requirer))
        .collect::<Vec<_>>()
        .join(", ")
}
