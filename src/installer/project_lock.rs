//! Cross-process exclusion for operations on one project.
//!
//! `lock` holds [`LockScope::Lockfile`] while resolving and writing the lock
//! artifact, and `sync` holds [`LockScope::Install`] while writing into the
//! install target. Two `lock` runs, or two `sync` runs, on the same project
//! therefore never interleave; a `lock` and a `sync` may, because the lock
//! artifact is replaced atomically and `sync` only reads it.
//!
//! Lock files live in `<project>/.pinsync/.locks/` and stay there after
//! release: every contender must lock the same inode, so the path is never
//! unlinked while someone may be waiting on it. All blocking file calls go
//! through `spawn_blocking`.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

use crate::constants::{
    MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS, STATE_DIR_NAME, default_lock_timeout,
};

/// What a project lock protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockScope {
    /// Writing the lock artifact
    Lockfile,
    /// Writing into the install target
    Install,
}

impl LockScope {
    const fn file_name(self) -> &'static str {
        match self {
            Self::Lockfile => "lockfile.lock",
            Self::Install => "install.lock",
        }
    }
}

/// A held exclusive lock, released on drop.
#[derive(Debug)]
pub struct ProjectLock {
    file: Arc<File>,
    scope: LockScope,
    path: PathBuf,
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(self.file.as_ref()) {
            debug!(scope = ?self.scope, error = %e, "Failed to unlock; released on close");
        }
        debug!(scope = ?self.scope, path = %self.path.display(), "Project lock released");
    }
}

impl ProjectLock {
    /// Acquire `scope` for `project_dir`, waiting up to the default timeout.
    pub async fn acquire(project_dir: &Path, scope: LockScope) -> Result<Self> {
        Self::acquire_with_timeout(project_dir, scope, default_lock_timeout()).await
    }

    /// Acquire `scope`, polling with exponential backoff until `timeout`.
    pub async fn acquire_with_timeout(
        project_dir: &Path,
        scope: LockScope,
        timeout: Duration,
    ) -> Result<Self> {
        let locks_dir = project_dir.join(STATE_DIR_NAME).join(".locks");
        tokio::fs::create_dir_all(&locks_dir).await.with_context(|| {
            format!("Failed to create project locks directory: {}", locks_dir.display())
        })?;

        let path = locks_dir.join(scope.file_name());
        let open_path = path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .context("Lock file open task panicked")?
        .with_context(|| format!("Failed to open lock file: {}", path.display()))?;
        let file = Arc::new(file);

        debug!(?scope, "Waiting for project lock");
        let start = Instant::now();
        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            let handle = Arc::clone(&file);
            let acquired = tokio::task::spawn_blocking(move || handle.try_lock_exclusive())
                .await
                .context("Lock attempt task panicked")?;

            if let Ok(true) = acquired {
                debug!(?scope, wait_ms = start.elapsed().as_millis(), "Project lock acquired");
                return Ok(Self {
                    file,
                    scope,
                    path,
                });
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(delay.min(remaining)).await;
        }

        Err(anyhow::anyhow!(
            "Timeout acquiring {} lock for {} after {timeout:?}; is another pinsync process running?",
            match scope {
                LockScope::Lockfile => "lockfile",
                LockScope::Install => "install",
            },
            project_dir.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lock_file_persists_and_is_reusable() {
        let temp = TempDir::new().unwrap();
        let lock = ProjectLock::acquire(temp.path(), LockScope::Lockfile).await.unwrap();

        let path = temp.path().join(".pinsync/.locks/lockfile.lock");
        assert!(path.exists());
        drop(lock);
        assert!(path.exists());

        let again = ProjectLock::acquire_with_timeout(
            temp.path(),
            LockScope::Lockfile,
            Duration::from_millis(100),
        )
        .await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_waiter_and_newcomer_never_hold_together() {
        let temp = TempDir::new().unwrap();
        let first = ProjectLock::acquire(temp.path(), LockScope::Install).await.unwrap();

        let dir = temp.path().to_path_buf();
        let waiter = tokio::spawn(async move {
            ProjectLock::acquire_with_timeout(&dir, LockScope::Install, Duration::from_secs(5)).await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(first);

        let second = waiter.await.unwrap().unwrap();
        let third = ProjectLock::acquire_with_timeout(
            temp.path(),
            LockScope::Install,
            Duration::from_millis(300),
        )
        .await;
        assert!(third.is_err());

        drop(second);
        let fourth = ProjectLock::acquire_with_timeout(
            temp.path(),
            LockScope::Install,
            Duration::from_millis(300),
        )
        .await;
        assert!(fourth.is_ok());
    }

    #[tokio::test]
    async fn test_same_scope_times_out_while_held() {
        let temp = TempDir::new().unwrap();
        let _held = ProjectLock::acquire(temp.path(), LockScope::Install).await.unwrap();

        let start = Instant::now();
        let err = ProjectLock::acquire_with_timeout(
            temp.path(),
            LockScope::Install,
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Timeout"));
        assert!(start.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_different_scopes_do_not_block() {
        let temp = TempDir::new().unwrap();
        let _install = ProjectLock::acquire(temp.path(), LockScope::Install).await.unwrap();
        let lockfile = ProjectLock::acquire_with_timeout(
            temp.path(),
            LockScope::Lockfile,
            Duration::from_millis(100),
        )
        .await;
        assert!(lockfile.is_ok());
    }
}
