//! Common test utilities for pinsync integration tests
//!
//! Each [`TestProject`] owns a temporary directory holding a local package
//! index and a project directory, and runs the `pinsync` binary against them
//! with a clean, explicit environment.

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use pinsync::test_utils::{IndexFixture, ProjectFixture};

/// Environment variables that must never leak from the developer's shell.
const SCRUBBED_ENV: &[&str] = &[
    "PINSYNC_TARGET",
    "PINSYNC_INDEX_MIRROR",
    "PINSYNC_CONFIG",
    "PINSYNC_NO_PROGRESS",
    "RUST_LOG",
];

/// A project wired to its own local index
pub struct TestProject {
    temp_dir: TempDir,
    pub index: IndexFixture,
    pub project: ProjectFixture,
}

impl TestProject {
    /// Empty index and project
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let index = IndexFixture::new(temp_dir.path().join("index"))?;
        let project = ProjectFixture::new(temp_dir.path().join("project"))?;
        Ok(Self {
            temp_dir,
            index,
            project,
        })
    }

    /// Index with `requests -> {idna, six}` and a dev-only `pytest`,
    /// plus a manifest requiring them
    pub fn with_sample_packages() -> Result<Self> {
        let test = Self::new()?;
        test.index.publish("six", "1.15.0", &[], &[("six.py", "# six 1.15")])?;
        test.index.publish("six", "1.16.0", &[], &[("six.py", "# six 1.16")])?;
        test.index.publish("idna", "3.4.0", &[], &[("idna/__init__.py", "# idna")])?;
        test.index.publish(
            "requests",
            "2.31.0",
            &[("idna", ">=2.5, <4"), ("six", ">=1.10")],
            &[("requests/__init__.py", "# requests"), ("requests/api.py", "def get(): pass")],
        )?;
        test.index.publish("pytest", "7.4.0", &[], &[("pytest.py", "# pytest")])?;
        test.project.write_manifest(&test.index, &[("requests", "*")], &[("pytest", "*")])?;
        Ok(test)
    }

    /// Scratch path inside the temporary directory (not created)
    pub fn scratch(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Project directory
    pub fn project_path(&self) -> &Path {
        self.project.dir()
    }

    /// Current lock artifact bytes
    pub fn lock_bytes(&self) -> Vec<u8> {
        std::fs::read(self.project.lock_path()).expect("lock artifact should exist")
    }

    /// `pinsync` command running in the project directory with a scrubbed environment
    pub fn pinsync(&self) -> Command {
        let mut cmd = Command::cargo_bin("pinsync").expect("pinsync binary is built");
        for key in SCRUBBED_ENV {
            cmd.env_remove(key);
        }
        cmd.current_dir(self.project.dir())
            .env("NO_COLOR", "1")
            .env("PINSYNC_NO_PROGRESS", "1")
            .env("PINSYNC_CONFIG", self.scratch("no-global-config.toml"));
        cmd
    }

    /// Run `pinsync lock` and assert success
    pub fn lock(&self) {
        self.pinsync().arg("lock").assert().success();
    }
}

/// Whether `path` exists, with a readable failure message
pub fn assert_exists(path: impl AsRef<Path>) {
    let path = path.as_ref();
    assert!(path.exists(), "Expected path to exist: {}", path.display());
}

/// Whether `path` is absent, with a readable failure message
pub fn assert_not_exists(path: impl AsRef<Path>) {
    let path = path.as_ref();
    assert!(!path.exists(), "Expected path to not exist: {}", path.display());
}
