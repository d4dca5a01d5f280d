//! Installing packages from a lock artifact.
//!
//! The installer consumes an [`InstallPlan`] (pins selected from a
//! [`LockFile`] plus the install target) and drives one install action per
//! package:
//!
//! 1. Skip when an install record shows the same version from an artifact
//!    whose hash is still locked, and its files are present.
//! 2. Fetch the artifact from the package's index.
//! 3. Verify the bytes against the locked hashes ([`checksum::verify`]).
//! 4. Extract the archive into the target ([`archive`]), write the record
//!    ([`record`]) and remove files a previous version left behind.
//!
//! # Execution Modes
//!
//! [`InstallMode::Sequential`] runs one package at a time in canonical order.
//! [`InstallMode::Concurrent`] runs up to `max_parallel` packages at once;
//! each package owns a disjoint set of paths in the target.
//!
//! With `fail_fast`, the first failure stops new packages from starting;
//! in-flight ones finish and never-started ones are reported as
//! [`InstallOutcome::Skipped`]. Results are always returned in canonical
//! order and the installer never writes the lock artifact.

pub mod archive;
pub mod project_lock;
pub mod record;

pub use project_lock::{LockScope, ProjectLock};
pub use record::{InstallRecord, RecordEntry};

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::checksum::{self, VerificationOutcome};
use crate::constants::default_max_parallel;
use crate::core::{Category, PinsyncError};
use crate::index::{Artifact, IndexSet};
use crate::lockfile::{LockFile, LockedPackage};
use crate::utils::ProgressBar;
use crate::version::parse_version;

/// One package to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPackage {
    /// Normalized name
    pub name: String,
    /// The pin from the lock artifact
    pub locked: LockedPackage,
}

/// Packages selected from a lock artifact, in canonical order, and their destination.
#[derive(Debug, Clone)]
pub struct InstallPlan {
    /// Install target directory
    pub target: PathBuf,
    /// Packages in canonical (name) order, each once
    pub packages: Vec<PlannedPackage>,
}

impl InstallPlan {
    /// Select the packages of `categories` from `lockfile`.
    ///
    /// A package present in several selected categories is installed once,
    /// using the pin of the first category that lists it.
    #[must_use]
    pub fn from_lockfile(lockfile: &LockFile, categories: &[Category], target: PathBuf) -> Self {
        let mut selected: BTreeMap<&str, &LockedPackage> = BTreeMap::new();
        for category in categories {
            if let Some(packages) = lockfile.category(*category) {
                for (name, locked) in packages {
                    selected.entry(name.as_str()).or_insert(locked);
                }
            }
        }
        Self {
            target,
            packages: selected
                .into_iter()
                .map(|(name, locked)| PlannedPackage {
                    name: name.to_string(),
                    locked: locked.clone(),
                })
                .collect(),
        }
    }

    /// Number of packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether there is nothing to install.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// How packages are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// One at a time, canonical order
    Sequential,
    /// Up to `max_parallel` at once
    Concurrent {
        /// Worker count (at least 1)
        max_parallel: usize,
    },
}

impl Default for InstallMode {
    fn default() -> Self {
        Self::Concurrent {
            max_parallel: default_max_parallel(),
        }
    }
}

impl InstallMode {
    const fn workers(self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Concurrent {
                max_parallel,
            } => {
                if max_parallel == 0 {
                    1
                } else {
                    max_parallel
                }
            }
        }
    }
}

/// Installer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    /// Scheduling mode
    pub mode: InstallMode,
    /// Stop starting packages after the first failure
    pub fail_fast: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            mode: InstallMode::default(),
            fail_fast: true,
        }
    }
}

/// What happened to one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Installed; `changed` is false when it was already up to date
    Installed {
        /// Whether files were written
        changed: bool,
    },
    /// The fetched artifact matched none of the locked hashes
    HashMismatch {
        /// Locked hashes
        expected: Vec<String>,
        /// Digest of the fetched bytes
        actual: String,
    },
    /// Fetching or unpacking failed
    InstallError {
        /// Diagnostic
        message: String,
    },
    /// Not attempted because an earlier package failed
    Skipped,
}

/// Per-package result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    /// Normalized package name
    pub name: String,
    /// Locked version
    pub version: String,
    /// Outcome
    pub outcome: InstallOutcome,
}

impl InstallResult {
    /// Whether the package ended up installed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, InstallOutcome::Installed { .. })
    }

    /// Whether the package was attempted and failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.outcome, InstallOutcome::HashMismatch { .. } | InstallOutcome::InstallError { .. })
    }
}

impl fmt::Display for InstallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            InstallOutcome::Installed {
                changed: true,
            } => write!(f, "Successfully installed {} {}", self.name, self.version),
            InstallOutcome::Installed {
                changed: false,
            } => write!(f, "Successfully installed {} {} (up to date)", self.name, self.version),
            InstallOutcome::HashMismatch {
                expected,
                actual,
            } => write!(
                f,
                "{}",
                PinsyncError::ChecksumMismatch {
                    name: self.name.clone(),
                    expected: expected.join(", "),
                    actual: actual.clone(),
                }
            ),
            InstallOutcome::InstallError {
                message,
            } => write!(f, "Failed to install {} {}: {message}", self.name, self.version),
            InstallOutcome::Skipped => {
                write!(f, "Skipped {} {} after an earlier failure", self.name, self.version)
            }
        }
    }
}

/// Results of one install run, in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// One result per planned package
    pub results: Vec<InstallResult>,
}

impl InstallReport {
    /// Whether every package was installed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.results.iter().all(InstallResult::is_success)
    }

    /// Names of packages that were attempted and failed.
    #[must_use]
    pub fn failed(&self) -> Vec<String> {
        self.results.iter().filter(|r| r.is_failure()).map(|r| r.name.clone()).collect()
    }

    /// Number of packages whose files were written.
    #[must_use]
    pub fn changed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, InstallOutcome::Installed { changed: true }))
            .count()
    }

    /// Number of packages not attempted.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome == InstallOutcome::Skipped).count()
    }

    /// Convert a failed report into [`PinsyncError::SyncFailed`].
    pub fn into_result(self) -> Result<Self, PinsyncError> {
        if self.is_success() {
            return Ok(self);
        }
        let mut failed = self.failed();
        if failed.is_empty() {
            failed = self.results.iter().filter(|r| !r.is_success()).map(|r| r.name.clone()).collect();
        }
        Err(PinsyncError::SyncFailed {
            failed,
        })
    }
}

/// Callback invoked as soon as each package finishes.
pub type ResultObserver<'a> = &'a (dyn Fn(&InstallResult) + Send + Sync);

/// Runs install plans against a set of indexes.
pub struct Installer<'a> {
    indexes: &'a IndexSet,
    options: InstallOptions,
    progress: ProgressBar,
    observer: Option<ResultObserver<'a>>,
}

impl<'a> Installer<'a> {
    /// Installer fetching from `indexes`.
    #[must_use]
    pub fn new(indexes: &'a IndexSet, options: InstallOptions) -> Self {
        Self {
            indexes,
            options,
            progress: ProgressBar::hidden(),
            observer: None,
        }
    }

    /// Advance `progress` once per finished package.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Report each result as it completes (sequential mode reports in order).
    #[must_use]
    pub fn with_observer(mut self, observer: ResultObserver<'a>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Install every package of `plan`.
    ///
    /// Per-package failures are captured in the report; this never returns
    /// early because one package failed.
    pub async fn install(&self, plan: &InstallPlan) -> InstallReport {
        let workers = self.options.mode.workers();
        let failed = Arc::new(AtomicBool::new(false));
        debug!(packages = plan.len(), workers, target = %plan.target.display(), "Installing");

        let mut indexed: Vec<(usize, InstallResult)> = stream::iter(plan.packages.iter().enumerate())
            .map(|(position, package)| {
                let failed = Arc::clone(&failed);
                async move {
                    if self.options.fail_fast && failed.load(Ordering::SeqCst) {
                        let result = InstallResult {
                            name: package.name.clone(),
                            version: package.locked.version.clone(),
                            outcome: InstallOutcome::Skipped,
                        };
                        warn!(package = %package.name, "Skipped after an earlier failure");
                        return (position, result);
                    }

                    let outcome = match self.install_package(package, &plan.target).await {
                        Ok(outcome) => outcome,
                        Err(e) => InstallOutcome::InstallError {
                            message: format!("{e:#}"),
                        },
                    };
                    let result = InstallResult {
                        name: package.name.clone(),
                        version: package.locked.version.clone(),
                        outcome,
                    };
                    if result.is_failure() {
                        failed.store(true, Ordering::SeqCst);
                        warn!(package = %result.name, "{result}");
                    } else {
                        info!(package = %result.name, version = %result.version, "Installed");
                    }
                    self.progress.inc(1);
                    if let Some(observer) = self.observer {
                        observer(&result);
                    }
                    (position, result)
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        indexed.sort_by_key(|(position, _)| *position);
        InstallReport {
            results: indexed.into_iter().map(|(_, result)| result).collect(),
        }
    }

    async fn install_package(&self, package: &PlannedPackage, target: &Path) -> Result<InstallOutcome> {
        let name = package.name.as_str();
        let locked = &package.locked;
        parse_version(&locked.version)?;

        let existing = {
            let target = target.to_path_buf();
            let lookup = name.to_string();
            tokio::task::spawn_blocking(move || InstallRecord::find(&target, &lookup))
                .await
                .context("Record lookup task panicked")??
        };
        if let Some((_, record)) = &existing
            && record.version == locked.version
            && checksum::normalize_hash(&record.artifact_hash)
                .is_some_and(|h| locked.hashes.iter().any(|l| checksum::normalize_hash(l).as_ref() == Some(&h)))
            && record.files_present(target)
        {
            debug!(package = name, "Already installed");
            return Ok(InstallOutcome::Installed {
                changed: false,
            });
        }

        let index = self.indexes.get(&locked.index)?;
        let releases = index
            .releases(name)
            .await?
            .ok_or_else(|| PinsyncError::PackageNotFound {
                name: name.to_string(),
            })?;
        let release = releases
            .iter()
            .find(|r| r.version.to_string() == locked.version)
            .ok_or_else(|| PinsyncError::InstallFailed {
                name: name.to_string(),
                reason: format!("version {} is no longer on index '{}'", locked.version, locked.index),
            })?;
        let artifact = select_artifact(&release.artifacts, &locked.hashes).ok_or_else(|| {
            PinsyncError::InstallFailed {
                name: name.to_string(),
                reason: format!("release {} has no artifacts", locked.version),
            }
        })?;

        let bytes = index.fetch(name, artifact).await?;
        let hash = match checksum::verify(&bytes, &locked.hashes) {
            VerificationOutcome::Match {
                hash,
            } => hash,
            VerificationOutcome::Mismatch {
                expected,
                actual,
            } => {
                return Ok(InstallOutcome::HashMismatch {
                    expected,
                    actual,
                });
            }
        };

        let package_name = name.to_string();
        let version = locked.version.clone();
        let target = target.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let files = archive::extract(&package_name, &bytes, &target)?;
            let record = InstallRecord {
                name: package_name,
                version,
                artifact_hash: hash,
                files,
            };
            record.write(&target)?;
            if let Some((old_dir, old)) = existing {
                old.remove_stale(&old_dir, &target, &record)?;
            }
            Ok(())
        })
        .await
        .context("Install task panicked")??;

        Ok(InstallOutcome::Installed {
            changed: true,
        })
    }
}

/// First artifact (by file name) whose published hash is locked, falling
/// back to the first artifact so verification reports the mismatch.
fn select_artifact<'r>(artifacts: &'r [Artifact], locked: &[String]) -> Option<&'r Artifact> {
    let locked: Vec<String> = locked.iter().filter_map(|h| checksum::normalize_hash(h)).collect();
    artifacts
        .iter()
        .find(|a| checksum::normalize_hash(&a.hash).is_some_and(|h| locked.contains(&h)))
        .or_else(|| artifacts.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::IndexFixture;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Setup {
        _temp: TempDir,
        indexes: IndexSet,
        lockfile: LockFile,
        target: PathBuf,
    }

    /// Index with three packages and a matching lock artifact.
    fn setup() -> Setup {
        let temp = TempDir::new().unwrap();
        let fixture = IndexFixture::new(temp.path().join("index")).unwrap();
        let mut lockfile = LockFile::new();
        for (name, file) in [("alpha", "alpha.py"), ("beta", "beta/__init__.py"), ("gamma", "gamma.py")] {
            let hash = fixture.publish(name, "1.0.0", &[], &[(file, name)]).unwrap();
            lockfile
                .category_mut(Category::Default)
                .insert(name.to_string(), LockedPackage::new("1.0.0", [hash], "main", []));
        }
        let indexes = IndexSet::from_sources(&[fixture.source("main")], None, temp.path()).unwrap();
        let target = temp.path().join("site");
        Setup {
            _temp: temp,
            indexes,
            lockfile,
            target,
        }
    }

    fn corrupt(lockfile: &mut LockFile, name: &str) {
        let package = lockfile.category_mut(Category::Default).get_mut(name).unwrap();
        package.hashes = vec![format!("sha256:{}", "0".repeat(64))];
    }

    #[tokio::test]
    async fn test_sequential_install_places_files_and_reports_in_order() {
        let s = setup();
        let plan = InstallPlan::from_lockfile(&s.lockfile, &[Category::Default], s.target.clone());
        let seen = Mutex::new(Vec::new());
        let observer = |r: &InstallResult| seen.lock().unwrap().push(r.name.clone());

        let report = Installer::new(
            &s.indexes,
            InstallOptions {
                mode: InstallMode::Sequential,
                fail_fast: true,
            },
        )
        .with_observer(&observer)
        .install(&plan)
        .await;

        assert!(report.is_success());
        assert_eq!(report.changed_count(), 3);
        assert_eq!(*seen.lock().unwrap(), vec!["alpha", "beta", "gamma"]);
        assert_eq!(std::fs::read_to_string(s.target.join("alpha.py")).unwrap(), "alpha");
        assert!(s.target.join("beta/__init__.py").exists());
        assert!(s.target.join("gamma-1.0.0.pinsync-info/RECORD").exists());
    }

    #[tokio::test]
    async fn test_second_install_is_unchanged() {
        let s = setup();
        let plan = InstallPlan::from_lockfile(&s.lockfile, &[Category::Default], s.target.clone());
        let installer = Installer::new(&s.indexes, InstallOptions::default());

        assert_eq!(installer.install(&plan).await.changed_count(), 3);
        let again = installer.install(&plan).await;
        assert!(again.is_success());
        assert_eq!(again.changed_count(), 0);
    }

    #[tokio::test]
    async fn test_hash_mismatch_fails_fast_in_sequential_mode() {
        let mut s = setup();
        corrupt(&mut s.lockfile, "beta");
        let plan = InstallPlan::from_lockfile(&s.lockfile, &[Category::Default], s.target.clone());

        let report = Installer::new(
            &s.indexes,
            InstallOptions {
                mode: InstallMode::Sequential,
                fail_fast: true,
            },
        )
        .install(&plan)
        .await;

        assert!(!report.is_success());
        assert!(report.results[0].is_success());
        assert!(matches!(report.results[1].outcome, InstallOutcome::HashMismatch { .. }));
        assert_eq!(report.results[2].outcome, InstallOutcome::Skipped);
        assert_eq!(report.failed(), vec!["beta"]);
        assert!(!s.target.join("beta/__init__.py").exists());
        assert!(!s.target.join("gamma.py").exists());

        let err = report.into_result().unwrap_err();
        assert!(err.to_string().contains("beta"));
    }

    async fn install_fail_fast(s: &Setup, max_parallel: usize) -> InstallReport {
        let plan = InstallPlan::from_lockfile(&s.lockfile, &[Category::Default], s.target.clone());
        Installer::new(
            &s.indexes,
            InstallOptions {
                mode: InstallMode::Concurrent {
                    max_parallel,
                },
                fail_fast: true,
            },
        )
        .install(&plan)
        .await
    }

    #[tokio::test]
    async fn test_concurrent_fail_fast_skips_packages_not_yet_started() {
        let mut s = setup();
        corrupt(&mut s.lockfile, "alpha");

        let report = install_fail_fast(&s, 1).await;

        assert!(!report.is_success());
        assert!(matches!(report.results[0].outcome, InstallOutcome::HashMismatch { .. }));
        assert_eq!(report.results[1].outcome, InstallOutcome::Skipped);
        assert_eq!(report.results[2].outcome, InstallOutcome::Skipped);
        assert_eq!(report.failed(), vec!["alpha"]);
        assert!(!s.target.join("gamma.py").exists());
        assert!(report.into_result().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_fail_fast_lets_in_flight_packages_finish() {
        let mut s = setup();
        corrupt(&mut s.lockfile, "alpha");

        let report = install_fail_fast(&s, 3).await;

        assert!(!report.is_success());
        assert_eq!(report.skipped_count(), 0);
        assert_eq!(report.failed(), vec!["alpha"]);
        assert!(report.results[1].is_success());
        assert!(report.results[2].is_success());
        assert!(s.target.join("beta/__init__.py").exists());
        assert!(s.target.join("gamma.py").exists());
        assert!(report.into_result().is_err());
    }

    #[tokio::test]
    async fn test_keep_going_installs_the_rest() {
        let mut s = setup();
        corrupt(&mut s.lockfile, "alpha");
        let plan = InstallPlan::from_lockfile(&s.lockfile, &[Category::Default], s.target.clone());

        let report = Installer::new(
            &s.indexes,
            InstallOptions {
                mode: InstallMode::Concurrent {
                    max_parallel: 4,
                },
                fail_fast: false,
            },
        )
        .install(&plan)
        .await;

        assert!(!report.is_success());
        assert_eq!(report.failed(), vec!["alpha"]);
        assert_eq!(report.skipped_count(), 0);
        assert!(s.target.join("gamma.py").exists());
        let names: Vec<_> = report.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn test_unknown_index_is_an_install_error() {
        let mut s = setup();
        s.lockfile.category_mut(Category::Default).get_mut("gamma").unwrap().index = "gone".into();
        let plan = InstallPlan::from_lockfile(&s.lockfile, &[Category::Default], s.target.clone());

        let report = Installer::new(
            &s.indexes,
            InstallOptions {
                mode: InstallMode::Sequential,
                fail_fast: false,
            },
        )
        .install(&plan)
        .await;
        assert!(matches!(report.results[2].outcome, InstallOutcome::InstallError { .. }));
        assert_eq!(report.failed(), vec!["gamma"]);
    }

    #[test]
    fn test_plan_deduplicates_across_categories() {
        let mut lockfile = LockFile::new();
        let pin = LockedPackage::new("1.0.0", ["sha256:aa".to_string()], "main", []);
        lockfile.category_mut(Category::Default).insert("six".into(), pin.clone());
        lockfile.category_mut(Category::Develop).insert("six".into(), pin.clone());
        lockfile.category_mut(Category::Develop).insert("pytest".into(), pin);

        let default_only = InstallPlan::from_lockfile(&lockfile, &[Category::Default], PathBuf::from("t"));
        assert_eq!(default_only.len(), 1);

        let both = InstallPlan::from_lockfile(&lockfile, &Category::ALL, PathBuf::from("t"));
        let names: Vec<_> = both.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["pytest", "six"]);
    }

    #[test]
    fn test_select_artifact_prefers_locked_hash() {
        let artifacts = vec![
            Artifact {
                filename: "a.zip".into(),
                hash: format!("sha256:{}", "1".repeat(64)),
            },
            Artifact {
                filename: "b.zip".into(),
                hash: format!("sha256:{}", "2".repeat(64)),
            },
        ];
        let locked = vec![format!("sha256:{}", "2".repeat(64))];
        assert_eq!(select_artifact(&artifacts, &locked).unwrap().filename, "b.zip");
        assert_eq!(select_artifact(&artifacts, &[]).unwrap().filename, "a.zip");
    }
}
