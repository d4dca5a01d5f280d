//! Version constraint parsing and matching.
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `*` or empty | any release (pre-releases excluded) |
//! | `1.2.3`, `v1.2.3`, `==1.2.3` | exactly that version |
//! | `^1.2`, `~1.2.0`, `>=1.0, <2.0` | a `semver::VersionReq` |
//!
//! ```rust,no_run
//! use pinsync::version::VersionConstraint;
//! use semver::Version;
//!
//! let caret = VersionConstraint::parse("^1.0.0")?;
//! assert!(caret.matches(&Version::parse("1.4.2")?));
//! assert!(!caret.matches(&Version::parse("2.0.0")?));
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::core::PinsyncError;
use semver::{Version, VersionReq};
use std::fmt;

/// A parsed version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Any release version
    Any,
    /// Exactly one version
    Exact(Version),
    /// A semver range
    Requirement(VersionReq),
}

impl VersionConstraint {
    /// Parse a constraint string.
    ///
    /// Whitespace is trimmed. Strings that are neither `*`, an exact version
    /// nor a valid semver requirement are rejected with
    /// [`PinsyncError::InvalidVersionConstraint`].
    pub fn parse(constraint: &str) -> Result<Self, PinsyncError> {
        let trimmed = constraint.trim();

        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::Any);
        }

        if let Some(exact) = trimmed.strip_prefix("==") {
            return super::parse_version(exact).map(Self::Exact).map_err(|e| {
                PinsyncError::InvalidVersionConstraint {
                    constraint: trimmed.to_string(),
                    reason: e.to_string(),
                }
            });
        }

        let starts_with_operator = trimmed.starts_with(['^', '~', '>', '<', '=', '*']);
        if !starts_with_operator && let Ok(version) = super::parse_version(trimmed) {
            return Ok(Self::Exact(version));
        }

        VersionReq::parse(trimmed).map(Self::Requirement).map_err(|e| {
            PinsyncError::InvalidVersionConstraint {
                constraint: trimmed.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Check if a version satisfies this constraint.
    ///
    /// `Any` never matches pre-releases; an exact pre-release constraint does,
    /// and ranges follow `semver` rules (a pre-release matches only when the
    /// range names a pre-release of the same `major.minor.patch`).
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Any => version.pre.is_empty(),
            Self::Exact(v) => v == version,
            Self::Requirement(req) => req.matches(version),
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Exact(v) => write!(f, "=={v}"),
            Self::Requirement(req) => write!(f, "{req}"),
        }
    }
}
