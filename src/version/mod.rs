//! Version parsing and constraint matching.
//!
//! Versions are semantic versions (`semver::Version`); a leading `v` is
//! accepted and stripped. Constraints are described in [`constraints`].

pub mod constraints;

pub use constraints::VersionConstraint;

use crate::core::PinsyncError;
use semver::Version;

/// Parse a version string, accepting an optional `v` prefix.
pub fn parse_version(raw: &str) -> Result<Version, PinsyncError> {
    let trimmed = raw.trim();
    let cleaned = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Ok(Version::parse(cleaned)?)
}
