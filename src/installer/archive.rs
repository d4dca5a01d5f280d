//! Zip archive extraction into the install target.

use anyhow::{Context, Result};
use std::io::{Cursor, Read};
use std::path::{Component, Path};

use crate::checksum;
use crate::constants::RECORD_DIR_SUFFIX;
use crate::core::PinsyncError;
use crate::utils::fs::atomic_write;

use super::record::RecordEntry;

/// Extract every file of a zip archive into `target`.
///
/// Each file is written atomically. Entries whose path would leave the target
/// (absolute paths, `..`) or land in a record directory are rejected before
/// anything is written. Returns the written files, sorted by path.
pub fn extract(package: &str, data: &[u8], target: &Path) -> Result<Vec<RecordEntry>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .with_context(|| format!("Artifact of '{package}' is not a valid zip archive"))?;

    let mut files = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i).with_context(|| format!("Failed to read zip entry {i}"))?;
        if entry.is_dir() {
            continue;
        }
        let relative = entry
            .enclosed_name()
            .filter(|p| p.components().all(|c| matches!(c, Component::Normal(_))))
            .ok_or_else(|| PinsyncError::InstallFailed {
                name: package.to_string(),
                reason: format!("archive entry '{}' escapes the install target", entry.name()),
            })?;
        if relative
            .components()
            .next()
            .is_some_and(|c| c.as_os_str().to_string_lossy().ends_with(RECORD_DIR_SUFFIX))
        {
            return Err(PinsyncError::InstallFailed {
                name: package.to_string(),
                reason: format!("archive entry '{}' overlaps an install record", entry.name()),
            }
            .into());
        }
        files.push((i, relative));
    }

    let mut written = Vec::with_capacity(files.len());
    for (i, relative) in files {
        let mut entry = archive.by_index(i).with_context(|| format!("Failed to read zip entry {i}"))?;
        let mut buffer = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
        entry
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read zip entry: {}", entry.name()))?;

        let destination = target.join(&relative);
        atomic_write(&destination, &buffer)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            // Keep the executable bits, drop anything unusual
            let mode = (mode & 0o755) | 0o644;
            std::fs::set_permissions(&destination, std::fs::Permissions::from_mode(mode)).ok();
        }

        written.push(RecordEntry {
            path: relative_to_string(&relative),
            hash: checksum::compute(&buffer),
        });
    }

    written.sort();
    Ok(written)
}

fn relative_to_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
