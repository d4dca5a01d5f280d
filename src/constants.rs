//! Global constants used throughout the pinsync codebase.
//!
//! File names, environment variable names, timeouts and parallelism defaults
//! live here so that the magic values stay discoverable.

use std::time::Duration;

/// Name of the project manifest.
pub const MANIFEST_FILE_NAME: &str = "pinsync.toml";

/// Name of the lock artifact written next to the manifest.
pub const LOCKFILE_NAME: &str = "pinsync.lock";

/// Project-local state directory (install target default, project locks).
pub const STATE_DIR_NAME: &str = ".pinsync";

/// Default install target, relative to the project directory.
pub const DEFAULT_SITE_DIR: &str = "site-packages";

/// Environment variable overriding the install target directory.
pub const ENV_INSTALL_TARGET: &str = "PINSYNC_TARGET";

/// Environment variable overriding the primary index URL.
pub const ENV_INDEX_MIRROR: &str = "PINSYNC_INDEX_MIRROR";

/// Environment variable overriding the global configuration file location.
pub const ENV_CONFIG_PATH: &str = "PINSYNC_CONFIG";

/// Environment variable disabling progress bars.
pub const ENV_NO_PROGRESS: &str = "PINSYNC_NO_PROGRESS";

/// Per-package metadata file inside an index directory.
pub const INDEX_METADATA_FILE: &str = "index.toml";

/// Suffix of the per-package install record directory.
pub const RECORD_DIR_SUFFIX: &str = "pinsync-info";

/// Default timeout for project lock acquisition (120 seconds).
pub fn default_lock_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Maximum backoff delay for exponential backoff (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting delay for exponential backoff (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Number of attempts for a single HTTP index request.
pub const HTTP_RETRY_ATTEMPTS: usize = 3;

/// Timeout for a single HTTP index request (30 seconds).
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on candidate versions tried by the resolver before giving up.
pub const MAX_RESOLUTION_ATTEMPTS: usize = 10_000;

/// Minimum number of parallel installs regardless of CPU count.
pub const MIN_PARALLELISM: usize = 10;

/// Multiplier applied to CPU core count for default parallelism.
pub const PARALLELISM_CORE_MULTIPLIER: usize = 2;

/// Default number of concurrent install workers.
pub fn default_max_parallel() -> usize {
    let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    (cores * PARALLELISM_CORE_MULTIPLIER).max(MIN_PARALLELISM)
}

/// Concurrent metadata requests while collecting release lists.
pub const METADATA_FETCH_CONCURRENCY: usize = 8;
