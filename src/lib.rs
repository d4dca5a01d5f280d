//! pinsync - deterministic dependency lock and hash-verified sync.
//!
//! pinsync follows a manifest/lock model:
//!
//! - `pinsync.toml` declares package indexes and version requirements, split
//!   into a `default` and a `develop` category
//! - `pinsync.lock` records, for every package in the closure of those
//!   requirements, one exact version and the acceptable artifact hashes
//!
//! `lock` resolves the manifest against the declared indexes and writes the
//! lock artifact. The output is byte-identical for identical inputs. `sync`
//! installs strictly from the lock artifact into a target directory,
//! verifying every downloaded artifact against its recorded hashes, and
//! never modifies the lock artifact.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`manifest`] - `pinsync.toml` loading and validation
//! - [`index`] - local and HTTP package indexes
//! - [`resolver`] - metadata collection and backtracking version selection
//! - [`lockfile`] - the versioned lock artifact and its atomic persistence
//! - [`checksum`] - SHA-256 hashing and verification
//! - [`installer`] - sequential and concurrent installs with per-package results
//! - [`target`] - install destination resolution
//! - [`project`] - the `lock` and `sync` entry points
//!
//! ## Supporting
//! - [`cli`] - command-line surface
//! - [`config`] - environment snapshot and global configuration
//! - [`constants`] - file names, environment variables and tuning values
//! - [`core`] - error types, categories and package names
//! - [`utils`] - filesystem helpers and progress reporting
//! - [`version`] - version constraint parsing and matching
//!
//! # Manifest Format
//!
//! ```toml
//! [[index]]
//! name = "main"
//! url = "https://packages.example.com/simple"
//! verify_ssl = true
//!
//! [packages]
//! requests = ">=2.28, <3"
//! six = "*"
//! internal-tool = { version = "^1.4", index = "main" }
//!
//! [dev-packages]
//! pytest = "7.*"
//! ```
//!
//! # Environment
//!
//! - `PINSYNC_TARGET` - install target directory for `sync`
//! - `PINSYNC_INDEX_MIRROR` - replacement URL for the primary index
//! - `PINSYNC_CONFIG` - location of the global configuration file
//! - `PINSYNC_NO_PROGRESS` - disable progress bars

pub mod checksum;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod index;
pub mod installer;
pub mod lockfile;
pub mod manifest;
pub mod project;
pub mod resolver;
pub mod target;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
