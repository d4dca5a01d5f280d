//! HTTP(S)-backed index.
//!
//! Requests are retried with exponential backoff, but only for transient
//! failures (connection errors, timeouts, 5xx and 429 responses). A 404 on a
//! package's metadata means the index does not know the package.

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::StatusCode;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};

use super::metadata::{Artifact, PackageMetadata, Release, is_safe_filename};
use super::{IndexSource, PackageIndex};
use crate::checksum;
use crate::constants::{
    HTTP_REQUEST_TIMEOUT, HTTP_RETRY_ATTEMPTS, INDEX_METADATA_FILE, MAX_BACKOFF_DELAY_MS,
    STARTING_BACKOFF_DELAY_MS,
};
use crate::core::PinsyncError;

#[derive(Debug)]
enum RequestError {
    NotFound,
    Transient(String),
    Permanent(String),
}

impl RequestError {
    const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    fn reason(&self) -> String {
        match self {
            Self::NotFound => "404 Not Found".to_string(),
            Self::Transient(reason) | Self::Permanent(reason) => reason.clone(),
        }
    }
}

/// Index served over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpIndex {
    source: IndexSource,
    url: String,
    client: reqwest::Client,
}

impl HttpIndex {
    /// Create a client for `url`. Certificate checks follow `source.verify_ssl`.
    pub fn new(source: IndexSource, url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!source.verify_ssl)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .user_agent(concat!("pinsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            source,
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn unreachable(&self, reason: impl Into<String>) -> PinsyncError {
        PinsyncError::IndexUnreachable {
            name: self.source.name.clone(),
            url: self.url.clone(),
            reason: reason.into(),
        }
    }

    fn package_url(&self, name: &str, file: &str) -> String {
        format!("{}/{name}/{file}", self.url)
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, RequestError> {
        let strategy = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
            .factor(2)
            .take(HTTP_RETRY_ATTEMPTS.saturating_sub(1));

        RetryIf::spawn(
            strategy,
            || async {
                debug!(url, "GET");
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| RequestError::Transient(e.to_string()))?;
                let status = response.status();
                if status == StatusCode::NOT_FOUND {
                    return Err(RequestError::NotFound);
                }
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    return Err(RequestError::Transient(format!("HTTP {status}")));
                }
                if !status.is_success() {
                    return Err(RequestError::Permanent(format!("HTTP {status}")));
                }
                response
                    .bytes()
                    .await
                    .map(|b| b.to_vec())
                    .map_err(|e| RequestError::Transient(e.to_string()))
            },
            |e: &RequestError| {
                if e.is_transient() {
                    warn!(url, reason = %e.reason(), "Retrying index request");
                }
                e.is_transient()
            },
        )
        .await
    }

    async fn load_releases(&self, name: &str) -> Result<Option<Vec<Release>>> {
        let url = self.package_url(name, INDEX_METADATA_FILE);
        let body = match self.get(&url).await {
            Ok(body) => body,
            Err(RequestError::NotFound) => return Ok(None),
            Err(e) => return Err(self.unreachable(e.reason()).into()),
        };
        let content = String::from_utf8(body).with_context(|| format!("Index metadata at {url} is not UTF-8"))?;
        let metadata = PackageMetadata::parse(&content, &url)?;

        let mut releases = Vec::with_capacity(metadata.releases.len());
        for entry in &metadata.releases {
            let mut artifacts = Vec::with_capacity(entry.artifacts.len());
            for artifact in &entry.artifacts {
                if !is_safe_filename(&artifact.filename) {
                    warn!(package = name, filename = %artifact.filename, "Ignoring artifact with unsafe file name");
                    continue;
                }
                let hash = match artifact.sha256.as_deref().and_then(checksum::normalize_hash) {
                    Some(hash) => hash,
                    None => {
                        debug!(package = name, filename = %artifact.filename, "No published hash, downloading to compute it");
                        let bytes = self.download(name, &artifact.filename).await?;
                        checksum::compute(&bytes)
                    }
                };
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

    async fn download(&self, name: &str, filename: &str) -> Result<Vec<u8>> {
        if !is_safe_filename(filename) {
            return Err(PinsyncError::InstallFailed {
                name: name.to_string(),
                reason: format!("unsafe artifact file name '{filename}'"),
            }
            .into());
        }
        let url = self.package_url(name, filename);
        self.get(&url).await.map_err(|e| self.unreachable(format!("{url}: {}", e.reason())).into())
    }
}

impl PackageIndex for HttpIndex {
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
        self.download(name, &artifact.filename).boxed()
    }
}
