//! Integration test suite for pinsync
//!
//! These tests drive the `pinsync` binary end to end against local package
//! indexes built in temporary directories.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **lock**: determinism, resolution failures, empty manifests
//! - **sync**: lock purity, missing lock, hash mismatch, verbose reporting
//! - **target_override**: `PINSYNC_TARGET` set and unset between runs
//! - **mirror**: `--index-mirror` and `PINSYNC_INDEX_MIRROR`

#[path = "../common/mod.rs"]
mod common;

mod lock;
mod mirror;
mod sync;
mod target_override;
