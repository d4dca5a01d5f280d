//! Filesystem-backed index (`file://` URLs and plain paths).

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::metadata::{Artifact, PackageMetadata, Release, is_safe_filename};
use super::{IndexSource, PackageIndex};
use crate::checksum;
use crate::constants::INDEX_METADATA_FILE;
use crate::core::PinsyncError;
use crate::utils::fs::expand_path;

/// Index rooted at a local directory.
///
/// Artifact hashes are always computed from the artifact bytes on disk. A
/// published `sha256` that disagrees is reported and ignored.
#[derive(Debug, Clone)]
pub struct LocalIndex {
    source: IndexSource,
    url: String,
    root: PathBuf,
}

impl LocalIndex {
    /// Open the index at `url`, resolving relative paths against `base_dir`.
    pub fn new(source: IndexSource, url: String, base_dir: &Path) -> Result<Self> {
        let raw = url.strip_prefix("file://").unwrap_or(&url);
        let root = expand_path(raw, base_dir);
        Ok(Self {
            source,
            url,
            root,
        })
    }

    /// Directory the index is served from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn unreachable(&self, reason: impl Into<String>) -> PinsyncError {
        PinsyncError::IndexUnreachable {
            name: self.source.name.clone(),
            url: self.url.clone(),
            reason: reason.into(),
        }
    }

    async fn load_releases(&self, name: &str) -> Result<Option<Vec<Release>>> {
        if !tokio::fs::try_exists(&self.root).await.unwrap_or(false) {
            return Err(self.unreachable("directory does not exist").into());
        }

        let package_dir = self.root.join(name);
        let metadata_path = package_dir.join(INDEX_METADATA_FILE);
        let content = match tokio::fs::read_to_string(&metadata_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(package = name, index = %self.source.name, "Package not on local index");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read index metadata: {}", metadata_path.display())
                });
            }
        };

        let metadata = PackageMetadata::parse(&content, &metadata_path.display().to_string())?;
        let mut releases = Vec::with_capacity(metadata.releases.len());
        for entry in &metadata.releases {
            let mut artifacts = Vec::with_capacity(entry.artifacts.len());
            for artifact in &entry.artifacts {
                if !is_safe_filename(&artifact.filename) {
                    warn!(package = name, filename = %artifact.filename, "Ignoring artifact with unsafe file name");
                    continue;
                }
                let path = package_dir.join(&artifact.filename);
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("Failed to read artifact: {}", path.display()))?;
                let hash = checksum::compute(&bytes);
                if let Some(published) = artifact.sha256.as_deref()
                    && checksum::normalize_hash(published).as_deref() != Some(hash.as_str())
                {
                    warn!(
                        package = name,
                        filename = %artifact.filename,
                        published,
                        actual = %hash,
                        "Published hash does not match artifact on disk"
                    );
                }
                artifacts.push(Artifact {
                    filename: artifact.filename.clone(),
                    hash,
                });
            }
            if let Some(release) = entry.to_release(name, artifacts)? {
                releases.push(release);
            }
        }
        Ok(Some(releases))
    }

    async fn read_artifact(&self, name: &str, artifact: &Artifact) -> Result<Vec<u8>> {
        if !is_safe_filename(&artifact.filename) {
            return Err(PinsyncError::InstallFailed {
                name: name.to_string(),
                reason: format!("unsafe artifact file name '{}'", artifact.filename),
            }
            .into());
        }
        let path = self.root.join(name).join(&artifact.filename);
        tokio::fs::read(&path)
            .await
            .map_err(|e| self.unreachable(format!("{}: {e}", path.display())).into())
    }
}

impl PackageIndex for LocalIndex {
    fn source(&self) -> &IndexSource {
        &self.source
    }

    fn effective_url(&self) -> &str {
        &self.url
    }

    fn releases<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<Vec<Release>>>> {
        self.load_releases(name).boxed()
    }

    fn fetch<'a>(&'a self, name: &'a str, artifact: &'a Artifact) -> BoxFuture<'a, Result<Vec<u8>>> {
        self.read_artifact(name, artifact).boxed()
    }
}
