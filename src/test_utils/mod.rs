//! Test utilities for pinsync
//!
//! Helpers shared by unit tests and the integration suite:
//! - [`init_test_logging`] - one-time tracing setup for test binaries
//! - [`IndexFixture`] - a local package index with real zip artifacts
//! - [`ProjectFixture`] - a project directory with a manifest
//!
//! # Example
//!
//! ```rust,no_run
//! use pinsync::test_utils::{IndexFixture, ProjectFixture};
//!
//! # fn example() -> anyhow::Result<()> {
//! let temp = tempfile::TempDir::new()?;
//! let index = IndexFixture::new(temp.path().join("index"))?;
//! index.publish("six", "1.16.0", &[], &[("six.py", "# six")])?;
//!
//! let project = ProjectFixture::new(temp.path().join("project"))?;
//! project.write_manifest(&index, &[("six", "*")], &[])?;
//! # Ok(())
//! # }
//! ```

pub mod fixtures;

pub use fixtures::{IndexFixture, ProjectFixture};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per test binary.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=pinsync=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        // Another harness may have installed a subscriber first.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
