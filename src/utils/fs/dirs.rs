//! Directory management helpers.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Ensures a directory exists, creating it and all parents if needed.
///
/// Fails if the path exists but is not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            format!(
                "Failed to create directory: {}\n\nCheck directory permissions and path validity",
                path.display()
            )
        })?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Removes a directory tree, treating "already gone" as success.
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove directory: {}", path.display())),
    }
}

/// Removes a file, treating "already gone" as success.
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove file: {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_rejects_files() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();

        assert!(ensure_dir(&file).is_err());
        assert!(ensure_dir(&temp.path().join("new/nested")).is_ok());
    }

    #[test]
    fn test_remove_helpers_ignore_missing() {
        let temp = TempDir::new().unwrap();
        remove_dir_if_exists(&temp.path().join("missing")).unwrap();
        remove_file_if_exists(&temp.path().join("missing.txt")).unwrap();
    }
}
