//! Error handling for pinsync
//!
//! This module provides the strongly-typed error enum used across the engine and the
//! user-facing rendering of those errors. The error system follows two principles:
//! 1. **Strongly-typed errors** so callers can tell failure modes apart
//!    (a missing lock artifact is never confused with a generic I/O failure)
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Manifest**: [`PinsyncError::ManifestNotFound`], [`PinsyncError::ManifestParseError`],
//!   [`PinsyncError::ManifestValidationError`], [`PinsyncError::InvalidVersionConstraint`]
//! - **Resolution**: [`PinsyncError::DependencyResolutionFailed`], [`PinsyncError::PackageNotFound`],
//!   [`PinsyncError::IndexNotFound`], [`PinsyncError::IndexUnreachable`]
//! - **Lock artifact**: [`PinsyncError::LockfileNotFound`], [`PinsyncError::LockfileParseError`],
//!   [`PinsyncError::LockfileVersionUnsupported`]
//! - **Install**: [`PinsyncError::ChecksumMismatch`], [`PinsyncError::InstallFailed`],
//!   [`PinsyncError::SyncFailed`]
//!
//! Pipeline code returns [`anyhow::Result`] and attaches context with
//! [`anyhow::Context`]. Typed variants survive the context layers and can be
//! recovered with `downcast_ref`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pinsync::core::{PinsyncError, ErrorContext, user_friendly_error};
//!
//! let error = PinsyncError::LockfileNotFound {
//!     file: "pinsync.lock".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // "error: pinsync.lock not found!" plus a suggestion
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for pinsync operations.
///
/// Each variant names one failure mode. Variants carry enough context (file
/// names, package names, hashes) to render a precise message without access
/// to the surrounding call stack.
#[derive(Error, Debug)]
pub enum PinsyncError {
    /// Manifest file (pinsync.toml) not found
    ///
    /// Raised when no manifest exists at the given path, or when discovery
    /// walked up to the filesystem root without finding one.
    #[error("Manifest file {path} not found")]
    ManifestNotFound {
        /// Path (or file name, during discovery) that was expected to exist
        path: String,
    },

    /// Manifest parsing error
    #[error("Invalid manifest file syntax in {file}")]
    ManifestParseError {
        /// Path to the manifest file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// Manifest content is well-formed but inconsistent
    #[error("Manifest validation failed: {reason}")]
    ManifestValidationError {
        /// Reason why manifest validation failed
        reason: String,
    },

    /// Invalid version constraint
    #[error("Invalid version constraint '{constraint}': {reason}")]
    InvalidVersionConstraint {
        /// The invalid version constraint string
        constraint: String,
        /// Why the constraint could not be parsed
        reason: String,
    },

    /// A requirement references an index that is not declared
    #[error("Index '{name}' is not declared")]
    IndexNotFound {
        /// Name of the missing index
        name: String,
    },

    /// An index could not be read
    ///
    /// Covers missing local directories, HTTP transport failures, timeouts and
    /// non-success status codes.
    #[error("Cannot reach index '{name}' at {url}: {reason}")]
    IndexUnreachable {
        /// Name of the index
        name: String,
        /// URL that was used (after any mirror override)
        url: String,
        /// Transport-level reason
        reason: String,
    },

    /// No index knows a required package
    #[error("Package '{name}' was not found on any index")]
    PackageNotFound {
        /// Normalized package name
        name: String,
    },

    /// No set of versions satisfies the requirements
    #[error("Cannot resolve dependencies: {reason}")]
    DependencyResolutionFailed {
        /// Human-readable description of the conflict
        reason: String,
    },

    /// Sync was invoked without a lock artifact
    ///
    /// This failure must stay distinguishable from generic I/O errors: the
    /// message names the missing lock artifact explicitly.
    #[error("{file} not found!")]
    LockfileNotFound {
        /// File name or path of the missing lock artifact
        file: String,
    },

    /// Lockfile parsing error
    #[error("Invalid lockfile syntax in {file}")]
    LockfileParseError {
        /// Path to the lockfile that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// Lockfile was written by a newer format version
    #[error("Lockfile version {found} is newer than supported version {supported}")]
    LockfileVersionUnsupported {
        /// Version found in the file
        found: u32,
        /// Highest version this build understands
        supported: u32,
    },

    /// Downloaded artifact does not match any recorded hash
    #[error("Checksum mismatch for package '{name}': expected one of [{expected}], got {actual}")]
    ChecksumMismatch {
        /// Package name
        name: String,
        /// Comma separated recorded hashes
        expected: String,
        /// Digest of the fetched bytes
        actual: String,
    },

    /// Install action failed for reasons other than a hash mismatch
    #[error("Failed to install package '{name}': {reason}")]
    InstallFailed {
        /// Package name
        name: String,
        /// Underlying reason
        reason: String,
    },

    /// One or more packages failed during sync
    #[error("Failed to install {} package(s): {}", failed.len(), failed.join(", "))]
    SyncFailed {
        /// Names of every failed package, in canonical order
        failed: Vec<String>,
    },

    /// File system error
    #[error("File system error: {operation} ({path})")]
    FileSystemError {
        /// Operation that failed
        operation: String,
        /// Path involved
        path: String,
    },

    /// Permission denied
    #[error("Permission denied: {operation} ({path})")]
    PermissionDenied {
        /// Operation that failed
        operation: String,
        /// Path involved
        path: String,
    },

    /// Semantic version parsing error
    #[error("Version parsing error: {0}")]
    Semver(#[from] semver::Error),

    /// Anything else
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// Error context wrapper that provides user-friendly error information.
///
/// Combines a [`PinsyncError`] with optional details (why it happened) and
/// a suggestion (what to do next).
///
/// ```rust,no_run
/// use pinsync::core::{PinsyncError, ErrorContext};
///
/// let context = ErrorContext::new(PinsyncError::ManifestNotFound { path: "pinsync.toml".into() })
///     .with_suggestion("Create a pinsync.toml file in your project directory")
///     .with_details("pinsync searches the current directory and its parents");
/// println!("{}", context);
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: PinsyncError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: PinsyncError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions.
///
/// Typed [`PinsyncError`]s are recovered even when wrapped in `anyhow`
/// context; the outer context messages become the details. Standard I/O and
/// TOML errors get generic suggestions. Everything else is rendered with its
/// full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let outer: Vec<String> = error.chain().map(ToString::to_string).collect();

    let error = match error.downcast::<PinsyncError>() {
        Ok(typed) => {
            let typed_msg = typed.to_string();
            let mut ctx = create_error_context(typed);
            let wrappers: Vec<&String> = outer.iter().filter(|m| **m != typed_msg).collect();
            if ctx.details.is_none() && !wrappers.is_empty() {
                ctx.details =
                    Some(wrappers.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(": "));
            }
            return ctx;
        }
        Err(error) => error,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(PinsyncError::PermissionDenied {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check file ownership and permissions of the project and install target")
                .with_details(error.to_string());
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(PinsyncError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct")
                .with_details(error.to_string());
            }
            _ => {}
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(PinsyncError::Other {
        message,
    })
}

fn create_error_context(error: PinsyncError) -> ErrorContext {
    match &error {
        PinsyncError::ManifestNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Create a pinsync.toml in your project directory or pass --manifest-path")
            .with_details("pinsync searches for pinsync.toml in the current directory and its parents"),
        PinsyncError::ManifestParseError { reason, .. } => {
            let reason = reason.clone();
            ErrorContext::new(error)
                .with_details(reason)
                .with_suggestion("Check the TOML syntax: quotes, brackets and table headers")
        }
        PinsyncError::ManifestValidationError { .. } | PinsyncError::IndexNotFound { .. } => {
            ErrorContext::new(error).with_suggestion(
                "Declare every index with [[index]] (name, url) and reference only declared names",
            )
        }
        PinsyncError::InvalidVersionConstraint { .. } => ErrorContext::new(error).with_suggestion(
            "Use '*', an exact version like '1.2.3', or a range like '>=1.0, <2.0' or '^1.4'",
        ),
        PinsyncError::IndexUnreachable { .. } => ErrorContext::new(error)
            .with_suggestion("Check the index URL, your network connection, or set PINSYNC_INDEX_MIRROR"),
        PinsyncError::PackageNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Check the package name for typos and that the index hosts it"),
        PinsyncError::DependencyResolutionFailed { .. } => ErrorContext::new(error).with_suggestion(
            "Relax the conflicting version constraints in pinsync.toml and run 'pinsync lock' again",
        ),
        PinsyncError::LockfileNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'pinsync lock' to create the lock artifact before syncing")
            .with_details("sync installs strictly from the lock artifact and never creates one"),
        PinsyncError::LockfileParseError { reason, .. } => {
            let reason = reason.clone();
            ErrorContext::new(error)
                .with_details(reason)
                .with_suggestion("Regenerate the lock artifact with 'pinsync lock'")
        }
        PinsyncError::LockfileVersionUnsupported { .. } => ErrorContext::new(error)
            .with_suggestion("Update pinsync to a version that understands this lockfile"),
        PinsyncError::ChecksumMismatch { .. } => ErrorContext::new(error)
            .with_suggestion("The artifact changed since locking; re-run 'pinsync lock' if the change is expected")
            .with_details("Hash verification protects against tampered or corrupted downloads"),
        PinsyncError::SyncFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Re-run with --verbose to see the failure of each package"),
        _ => ErrorContext::new(error),
    }
}
