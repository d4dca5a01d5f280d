//! Project entry points: `lock` and `sync`.
//!
//! A project is the directory holding `pinsync.toml` and `pinsync.lock`.
//! [`Project::lock`] resolves the manifest and replaces the lock artifact;
//! [`Project::sync`] installs strictly from the lock artifact and never
//! writes it. Settings reach both as explicit option values; neither reads
//! the process environment.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::EnvOverrides;
use crate::constants::{LOCKFILE_NAME, MANIFEST_FILE_NAME};
use crate::core::{Category, PinsyncError};
use crate::index::IndexSet;
use crate::installer::{
    InstallOptions, InstallPlan, InstallReport, Installer, LockScope, ProjectLock, ResultObserver,
};
use crate::lockfile::LockFile;
use crate::manifest::Manifest;
use crate::resolver::Resolver;
use crate::target::resolve_target;
use crate::utils::ProgressBar;
use crate::utils::fs::find_upwards;

/// Options for [`Project::lock`].
#[derive(Debug, Clone, Default)]
pub struct LockOptions {
    /// Replacement URL for the primary index, already resolved by precedence
    pub index_mirror: Option<String>,
}

/// Result of a successful lock.
#[derive(Debug, Clone)]
pub struct LockOutcome {
    /// The resolved artifact
    pub lockfile: LockFile,
    /// Where it was saved
    pub path: PathBuf,
    /// False when the file already had identical content
    pub written: bool,
}

/// Options for [`Project::sync`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Categories to install; `default` is always included by the CLI
    pub categories: Vec<Category>,
    /// Scheduling and strictness
    pub install: InstallOptions,
    /// Replacement URL for the primary index, already resolved by precedence
    pub index_mirror: Option<String>,
    /// Environment snapshot for this invocation
    pub env: EnvOverrides,
    /// Draw a progress bar
    pub progress: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            categories: vec![Category::Default],
            install: InstallOptions::default(),
            index_mirror: None,
            env: EnvOverrides::default(),
            progress: false,
        }
    }
}

/// A located project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    dir: PathBuf,
    manifest_path: PathBuf,
    lock_path: PathBuf,
}

impl Project {
    /// Project rooted at `dir`.
    #[must_use]
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            manifest_path: dir.join(MANIFEST_FILE_NAME),
            lock_path: dir.join(LOCKFILE_NAME),
            dir,
        }
    }

    /// Locate the project from the current directory.
    pub fn discover(manifest_path: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        Self::discover_from(&cwd, manifest_path)
    }

    /// Locate the project.
    ///
    /// An explicit manifest path fixes the project directory to its parent
    /// (the file itself may be absent; `sync` only needs the lock artifact).
    /// Otherwise `start` and its parents are searched for a manifest, then
    /// for a lock artifact.
    pub fn discover_from(start: &Path, manifest_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = manifest_path {
            let path = if path.is_absolute() { path.to_path_buf() } else { start.join(path) };
            let dir = path.parent().map_or_else(|| start.to_path_buf(), Path::to_path_buf);
            return Ok(Self {
                lock_path: dir.join(LOCKFILE_NAME),
                manifest_path: path,
                dir,
            });
        }

        let found = find_upwards(start, MANIFEST_FILE_NAME).or_else(|| find_upwards(start, LOCKFILE_NAME));
        match found.as_deref().and_then(Path::parent) {
            Some(dir) => {
                debug!(project = %dir.display(), "Found project");
                Ok(Self::at(dir))
            }
            None => Err(PinsyncError::ManifestNotFound {
                path: MANIFEST_FILE_NAME.to_string(),
            }
            .into()),
        }
    }

    /// Project directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Manifest path.
    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Lock artifact path.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Resolve the manifest and save the lock artifact.
    ///
    /// Nothing is written unless resolution succeeds.
    pub async fn lock(&self, options: &LockOptions) -> Result<LockOutcome> {
        let manifest = Manifest::load(&self.manifest_path)?;
        manifest.validate()?;

        let indexes = IndexSet::from_sources(&manifest.indexes, options.index_mirror.as_deref(), &self.dir)?;

        let _guard = ProjectLock::acquire(&self.dir, LockScope::Lockfile).await?;
        let lockfile = Resolver::new(&indexes).resolve(&manifest).await?;
        let written = lockfile.save(&self.lock_path)?;
        if written {
            info!(path = %self.lock_path.display(), "Wrote lock artifact");
        } else {
            info!(path = %self.lock_path.display(), "Lock artifact already up to date");
        }

        Ok(LockOutcome {
            lockfile,
            path: self.lock_path.clone(),
            written,
        })
    }

    /// Install the selected categories from the lock artifact.
    ///
    /// Fails with [`PinsyncError::LockfileNotFound`] when there is no lock
    /// artifact and with [`PinsyncError::SyncFailed`] when any package fails.
    /// `observer` sees every package result as it completes.
    pub async fn sync(
        &self,
        options: &SyncOptions,
        observer: Option<ResultObserver<'_>>,
    ) -> Result<InstallReport> {
        let lockfile = LockFile::load(&self.lock_path)?;
        self.warn_if_stale(&lockfile);

        let target = resolve_target(&options.env, &self.dir);
        let indexes =
            IndexSet::from_sources(&lockfile.meta.indexes, options.index_mirror.as_deref(), &self.dir)?;
        let plan = InstallPlan::from_lockfile(&lockfile, &options.categories, target);
        info!(packages = plan.len(), target = %plan.target.display(), "Syncing");

        let _guard = ProjectLock::acquire(&self.dir, LockScope::Install).await?;
        let progress = ProgressBar::new(plan.len() as u64, options.progress);
        progress.set_message("Installing packages");

        let mut installer = Installer::new(&indexes, options.install).with_progress(progress.clone());
        if let Some(observer) = observer {
            installer = installer.with_observer(observer);
        }
        let report = installer.install(&plan).await;
        progress.finish_and_clear();

        Ok(report.into_result()?)
    }

    fn warn_if_stale(&self, lockfile: &LockFile) {
        if !self.manifest_path.exists() {
            return;
        }
        match Manifest::load(&self.manifest_path).and_then(|m| lockfile.is_stale(&m)) {
            Ok(true) => warn!(
                "{} is out of date with {}; run 'pinsync lock' to update it. Installing from the existing lock artifact.",
                LOCKFILE_NAME, MANIFEST_FILE_NAME
            ),
            Ok(false) => {}
            Err(e) => debug!("Skipping staleness check: {e:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::{InstallMode, InstallOutcome};
    use crate::test_utils::{IndexFixture, ProjectFixture};
    use tempfile::TempDir;

    fn fixture() -> (TempDir, IndexFixture, ProjectFixture) {
        let temp = TempDir::new().unwrap();
        let index = IndexFixture::new(temp.path().join("index")).unwrap();
        index.publish("six", "1.16.0", &[], &[("six.py", "# six")]).unwrap();
        index.publish("requests", "2.31.0", &[("six", ">=1")], &[("requests/__init__.py", "")]).unwrap();
        index.publish("pytest", "7.4.0", &[], &[("pytest.py", "")]).unwrap();
        let project = ProjectFixture::new(temp.path().join("project")).unwrap();
        project.write_manifest(&index, &[("requests", "*")], &[("pytest", "*")]).unwrap();
        (temp, index, project)
    }

    #[test]
    fn test_discover_walks_up_and_honors_explicit_path() {
        let (_temp, _index, project) = fixture();
        let nested = project.dir().join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();

        let found = Project::discover_from(&nested, None).unwrap();
        assert_eq!(found.dir(), project.dir());

        let explicit = Project::discover_from(Path::new("/"), Some(&project.manifest_path())).unwrap();
        assert_eq!(explicit.lock_path(), project.lock_path());
    }

    #[test]
    fn test_discover_without_project_fails() {
        let temp = TempDir::new().unwrap();
        let err = Project::discover_from(temp.path(), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PinsyncError>(),
            Some(PinsyncError::ManifestNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_lock_then_sync_installs_default_category() {
        let (_temp, _index, fixture) = fixture();
        let project = Project::at(fixture.dir());

        let outcome = project.lock(&LockOptions::default()).await.unwrap();
        assert!(outcome.written);
        assert_eq!(outcome.lockfile.category(Category::Default).unwrap().len(), 2);

        let before = std::fs::read(fixture.lock_path()).unwrap();
        let report = project.sync(&SyncOptions::default(), None).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.results.len(), 2);
        assert!(fixture.default_target().join("six.py").exists());
        assert!(!fixture.default_target().join("pytest.py").exists());
        assert_eq!(std::fs::read(fixture.lock_path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_second_lock_is_byte_identical() {
        let (_temp, _index, fixture) = fixture();
        let project = Project::at(fixture.dir());

        project.lock(&LockOptions::default()).await.unwrap();
        let first = std::fs::read(fixture.lock_path()).unwrap();
        let second = project.lock(&LockOptions::default()).await.unwrap();
        assert!(!second.written);
        assert_eq!(std::fs::read(fixture.lock_path()).unwrap(), first);
    }

    #[tokio::test]
    async fn test_sync_without_lock_fails_distinctly() {
        let (_temp, _index, fixture) = fixture();
        let err = Project::at(fixture.dir()).sync(&SyncOptions::default(), None).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<PinsyncError>().map(ToString::to_string).as_deref(),
            Some("pinsync.lock not found!")
        );
    }

    #[tokio::test]
    async fn test_sync_dev_and_target_override() {
        let (temp, _index, fixture) = fixture();
        let project = Project::at(fixture.dir());
        project.lock(&LockOptions::default()).await.unwrap();

        let custom = temp.path().join("custom-target");
        let options = SyncOptions {
            categories: Category::ALL.to_vec(),
            install: InstallOptions {
                mode: InstallMode::Sequential,
                fail_fast: true,
            },
            env: EnvOverrides::from_vars([(
                crate::constants::ENV_INSTALL_TARGET,
                custom.display().to_string(),
            )]),
            ..SyncOptions::default()
        };
        let report = project.sync(&options, None).await.unwrap();
        assert_eq!(report.results.len(), 3);
        assert!(custom.join("pytest.py").exists());
        assert!(!fixture.default_target().exists());
    }

    #[tokio::test]
    async fn test_sync_reports_hash_mismatch_as_sync_failed() {
        let (_temp, _index, fixture) = fixture();
        let project = Project::at(fixture.dir());
        let mut lockfile = project.lock(&LockOptions::default()).await.unwrap().lockfile;
        lockfile.category_mut(Category::Default).get_mut("six").unwrap().hashes =
            vec![format!("sha256:{}", "0".repeat(64))];
        lockfile.save(&fixture.lock_path()).unwrap();

        let options = SyncOptions {
            install: InstallOptions {
                mode: InstallMode::Sequential,
                fail_fast: true,
            },
            ..SyncOptions::default()
        };
        let seen = std::sync::Mutex::new(Vec::new());
        let observer = |r: &crate::installer::InstallResult| seen.lock().unwrap().push(r.outcome.clone());
        let err = project.sync(&options, Some(&observer)).await.unwrap_err();
        match err.downcast_ref::<PinsyncError>() {
            Some(PinsyncError::SyncFailed {
                failed,
            }) => assert_eq!(failed, &vec!["six".to_string()]),
            other => panic!("expected SyncFailed, got {other:?}"),
        }
        assert!(seen.lock().unwrap().iter().any(|o| matches!(o, InstallOutcome::HashMismatch { .. })));
    }
}
