//! Fixtures for indexes and projects.

use anyhow::{Context, Result};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use crate::checksum;
use crate::constants::{INDEX_METADATA_FILE, LOCKFILE_NAME, MANIFEST_FILE_NAME};
use crate::index::IndexSource;
use crate::index::metadata::{ArtifactEntry, PackageMetadata, ReleaseEntry};
use crate::target::default_target;

/// A local index laid out the way [`crate::index::LocalIndex`] reads it.
#[derive(Debug, Clone)]
pub struct IndexFixture {
    root: PathBuf,
}

impl IndexFixture {
    /// Create an empty index at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create index root: {}", root.display()))?;
        Ok(Self {
            root,
        })
    }

    /// Index directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `file://` URL of the index.
    #[must_use]
    pub fn url(&self) -> String {
        format!("file://{}", self.root.display())
    }

    /// Declaration of this index under `name`.
    #[must_use]
    pub fn source(&self, name: &str) -> IndexSource {
        IndexSource::new(name, self.url())
    }

    /// Publish a release whose zip artifact contains `files` (path, content).
    ///
    /// Returns the `sha256:` hash of the artifact.
    pub fn publish(
        &self,
        name: &str,
        version: &str,
        requires: &[(&str, &str)],
        files: &[(&str, &str)],
    ) -> Result<String> {
        let package_dir = self.root.join(name);
        std::fs::create_dir_all(&package_dir)?;

        let filename = format!("{name}-{version}.zip");
        let bytes = zip_archive(files)?;
        std::fs::write(package_dir.join(&filename), &bytes)?;
        let hash = checksum::compute(&bytes);

        let metadata_path = package_dir.join(INDEX_METADATA_FILE);
        let mut metadata = match std::fs::read_to_string(&metadata_path) {
            Ok(content) => PackageMetadata::parse(&content, &metadata_path.display().to_string())?,
            Err(_) => PackageMetadata::default(),
        };
        metadata.releases.retain(|r| r.version != version);
        metadata.releases.push(ReleaseEntry {
            version: version.to_string(),
            requires: requires.iter().map(|(n, c)| ((*n).to_string(), (*c).to_string())).collect(),
            artifacts: vec![ArtifactEntry {
                filename,
                sha256: Some(hash.trim_start_matches(checksum::SHA256_PREFIX).to_string()),
            }],
        });
        std::fs::write(&metadata_path, toml::to_string(&metadata)?)?;
        Ok(hash)
    }
}

/// Build an in-memory zip of `(path, content)` entries.
pub fn zip_archive(files: &[(&str, &str)]) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .last_modified_time(zip::DateTime::default());
        for (path, content) in files {
            zip.start_file(*path, options)?;
            zip.write_all(content.as_bytes())?;
        }
        zip.finish()?;
    }
    Ok(buf.into_inner())
}

/// A project directory.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    dir: PathBuf,
}

impl ProjectFixture {
    /// Create the project directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
        })
    }

    /// Project directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `pinsync.toml` path.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE_NAME)
    }

    /// `pinsync.lock` path.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCKFILE_NAME)
    }

    /// Default install target of this project.
    #[must_use]
    pub fn default_target(&self) -> PathBuf {
        default_target(&self.dir)
    }

    /// Write a manifest using `index` as the only index (named `main`).
    pub fn write_manifest(
        &self,
        index: &IndexFixture,
        packages: &[(&str, &str)],
        dev_packages: &[(&str, &str)],
    ) -> Result<()> {
        let mut content = format!("[[index]]\nname = \"main\"\nurl = \"{}\"\n", index.url());
        content.push_str("\n[packages]\n");
        for (name, constraint) in packages {
            content.push_str(&format!("{name} = \"{constraint}\"\n"));
        }
        content.push_str("\n[dev-packages]\n");
        for (name, constraint) in dev_packages {
            content.push_str(&format!("{name} = \"{constraint}\"\n"));
        }
        self.write_raw_manifest(&content)
    }

    /// Write manifest content verbatim.
    pub fn write_raw_manifest(&self, content: &str) -> Result<()> {
        std::fs::write(self.manifest_path(), content)?;
        Ok(())
    }
}
