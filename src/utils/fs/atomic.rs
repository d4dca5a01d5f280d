//! Atomic file write operations using temp-and-rename strategy.
//!
//! This module provides safe, atomic file writing that prevents corruption
//! from interrupted writes.

use crate::utils::fs::dirs::ensure_dir;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// 1. Writes content to a uniquely named temporary file in the target directory
/// 2. Syncs the temporary file to disk
/// 3. Renames the temporary file over the target path
///
/// The temporary file lives in the same directory as the target so the rename
/// never crosses a filesystem boundary. Concurrent writers to *different*
/// targets in one directory never share a temporary name.
///
/// # Guarantees
///
/// - **Atomicity**: the target holds either the old or the new content
/// - **Durability**: content is synced before the rename
/// - **Failure**: on error the previous file (if any) is untouched and the
///   temporary file is removed
///
/// ```rust,no_run
/// use pinsync::utils::fs::atomic_write;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// atomic_write(Path::new("pinsync.lock"), b"version = 1\n")?;
/// # Ok(())
/// # }
/// ```
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".pinsync-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .with_context(|| {
            format!(
                "Failed to create temp file in: {}\n\nCheck file permissions and that directory exists",
                parent.display()
            )
        })?;

    temp.write_all(content)
        .with_context(|| format!("Failed to write to temp file for: {}", path.display()))?;
    temp.as_file().sync_all().with_context(|| "Failed to sync file to disk")?;

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}
