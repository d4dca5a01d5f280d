//! Package index access.
//!
//! An index is a tree of per-package directories:
//!
//! ```text
//! <index-root>/
//! ├── requests/
//! │   ├── index.toml            # release metadata, see [`metadata`]
//! │   └── requests-2.31.0.zip   # artifacts
//! └── six/
//!     ├── index.toml
//!     └── six-1.16.0.zip
//! ```
//!
//! The same layout is served from the local filesystem ([`LocalIndex`]) or
//! over HTTP(S) ([`HttpIndex`]). Both implement [`PackageIndex`]; the resolver
//! and installer only see an [`IndexSet`], the ordered collection of the
//! indexes declared by a manifest or recorded in a lock artifact.
//!
//! # Mirror Override
//!
//! A mirror URL replaces the URL of the *primary* (first) index for every
//! request. The declared [`IndexSource`] is kept unchanged, so lock artifacts
//! never record the mirror.

pub mod http;
pub mod local;
pub mod metadata;

pub use http::HttpIndex;
pub use local::LocalIndex;
pub use metadata::{Artifact, PackageMetadata, Release};

use anyhow::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::core::PinsyncError;

/// A named index declaration, as written in the manifest and recorded in the lock artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSource {
    /// Unique index name
    pub name: String,
    /// `file://` URL, filesystem path, or `http(s)://` URL
    pub url: String,
    /// Whether TLS certificates are verified for HTTPS indexes
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
}

const fn default_verify_ssl() -> bool {
    true
}

impl IndexSource {
    /// Convenience constructor with certificate verification enabled.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            verify_ssl: true,
        }
    }
}

/// Read access to one package index.
///
/// Methods return boxed futures so indexes can be stored as trait objects.
pub trait PackageIndex: Send + Sync {
    /// The declared source (never the mirror URL).
    fn source(&self) -> &IndexSource;

    /// URL actually used for requests.
    fn effective_url(&self) -> &str;

    /// Every release of `name` (normalized), or `None` when the index does not
    /// know the package. Transport failures are [`PinsyncError::IndexUnreachable`].
    fn releases<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<Vec<Release>>>>;

    /// Download the bytes of one artifact of package `name`.
    fn fetch<'a>(&'a self, name: &'a str, artifact: &'a Artifact) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Ordered collection of indexes.
#[derive(Clone, Default)]
pub struct IndexSet {
    indexes: Vec<Arc<dyn PackageIndex>>,
}

impl std::fmt::Debug for IndexSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.indexes.iter().map(|i| (&i.source().name, i.effective_url()))).finish()
    }
}

impl IndexSet {
    /// Build indexes from declarations.
    ///
    /// `mirror` replaces the primary index URL. Relative filesystem paths are
    /// resolved against `base_dir`.
    pub fn from_sources(sources: &[IndexSource], mirror: Option<&str>, base_dir: &Path) -> Result<Self> {
        let mut indexes: Vec<Arc<dyn PackageIndex>> = Vec::with_capacity(sources.len());
        for (position, source) in sources.iter().enumerate() {
            let url = match mirror {
                Some(mirror) if position == 0 => {
                    debug!(index = %source.name, mirror, "Using index mirror");
                    mirror.to_string()
                }
                _ => source.url.clone(),
            };
            indexes.push(open_index(source.clone(), url, base_dir)?);
        }
        Ok(Self {
            indexes,
        })
    }

    /// Declared sources, in order.
    #[must_use]
    pub fn sources(&self) -> Vec<IndexSource> {
        self.indexes.iter().map(|i| i.source().clone()).collect()
    }

    /// Whether no index is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Look up an index by name.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn PackageIndex>, PinsyncError> {
        self.indexes.iter().find(|i| i.source().name == name).ok_or_else(|| {
            PinsyncError::IndexNotFound {
                name: name.to_string(),
            }
        })
    }

    /// Find the releases of `package`.
    ///
    /// An explicit index is authoritative. Otherwise indexes are searched in
    /// declaration order and the first that knows the package wins. Returns
    /// the name of the index that answered together with its releases.
    pub async fn find_releases(
        &self,
        package: &str,
        explicit_index: Option<&str>,
    ) -> Result<(String, Vec<Release>)> {
        if let Some(index_name) = explicit_index {
            let index = self.get(index_name)?;
            return match index.releases(package).await? {
                Some(releases) => Ok((index_name.to_string(), releases)),
                None => Err(PinsyncError::PackageNotFound {
                    name: package.to_string(),
                }
                .into()),
            };
        }

        for index in &self.indexes {
            if let Some(releases) = index.releases(package).await? {
                debug!(package, index = %index.source().name, count = releases.len(), "Found releases");
                return Ok((index.source().name.clone(), releases));
            }
        }

        Err(PinsyncError::PackageNotFound {
            name: package.to_string(),
        }
        .into())
    }
}

fn open_index(source: IndexSource, url: String, base_dir: &Path) -> Result<Arc<dyn PackageIndex>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(Arc::new(HttpIndex::new(source, url)?))
    } else {
        Ok(Arc::new(LocalIndex::new(source, url, base_dir)?))
    }
}
