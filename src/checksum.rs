//! Content hashing and hash verification.
//!
//! Every hash pinsync records or compares has the form `sha256:<hex>`.
//! Verification is independent of how the bytes were obtained: callers hand
//! over the artifact bytes and the hashes recorded in the lock artifact, and
//! receive a typed [`VerificationOutcome`] instead of an error, so the
//! installer can attribute a mismatch to the package it was installing.
//!
//! ```rust,no_run
//! use pinsync::checksum::{compute, verify, VerificationOutcome};
//!
//! let bytes = b"artifact";
//! let recorded = vec![compute(bytes)];
//! assert!(verify(bytes, &recorded).is_match());
//! ```

use sha2::{Digest, Sha256};
use std::fmt;

/// Algorithm prefix for every hash pinsync produces.
pub const SHA256_PREFIX: &str = "sha256:";

/// Result of comparing artifact bytes against the recorded hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// One of the recorded hashes matched
    Match {
        /// The digest of the bytes (`sha256:<hex>`)
        hash: String,
    },
    /// None of the recorded hashes matched
    Mismatch {
        /// The recorded hashes, as given
        expected: Vec<String>,
        /// The digest of the bytes (`sha256:<hex>`)
        actual: String,
    },
}

impl VerificationOutcome {
    /// Whether verification succeeded.
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match {
                hash,
            } => write!(f, "hash {hash} matches"),
            Self::Mismatch {
                expected,
                actual,
            } => write!(f, "got {actual}, expected one of [{}]", expected.join(", ")),
        }
    }
}

/// Compute the `sha256:<hex>` digest of `bytes`.
#[must_use]
pub fn compute(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{SHA256_PREFIX}{}", hex::encode(hasher.finalize()))
}

/// Verify `bytes` against every acceptable hash recorded for a package.
///
/// Any single match is sufficient, which lets one lock entry carry hashes
/// of several artifacts of the same release (e.g. per platform). Recorded
/// hashes may be written `sha256:<hex>` or as bare hex; hex comparison is
/// case-insensitive. Hashes with another algorithm prefix never match, and
/// an empty recorded set is always a mismatch.
#[must_use]
pub fn verify(bytes: &[u8], expected: &[String]) -> VerificationOutcome {
    let actual = compute(bytes);
    let actual_hex = &actual[SHA256_PREFIX.len()..];

    let matched = expected
        .iter()
        .filter_map(|recorded| sha256_hex(recorded))
        .any(|hex| hex.eq_ignore_ascii_case(actual_hex));

    if matched {
        VerificationOutcome::Match {
            hash: actual,
        }
    } else {
        VerificationOutcome::Mismatch {
            expected: expected.to_vec(),
            actual,
        }
    }
}

/// Normalize a recorded hash to `sha256:<lowercase hex>`.
///
/// Returns `None` when the value is not a well-formed SHA-256 hash.
#[must_use]
pub fn normalize_hash(recorded: &str) -> Option<String> {
    sha256_hex(recorded).map(|hex| format!("{SHA256_PREFIX}{}", hex.to_ascii_lowercase()))
}

fn sha256_hex(recorded: &str) -> Option<&str> {
    let recorded = recorded.trim();
    let hex = match recorded.split_once(':') {
        Some((algo, hex)) if algo.eq_ignore_ascii_case("sha256") => hex,
        Some(_) => return None,
        None => recorded,
    };
    (hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit())).then_some(hex)
}
