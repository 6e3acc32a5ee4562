//! Where model artifacts come from
//!
//! The registry only sees `ArtifactSource`; deployments choose between a
//! local model directory and an HTTP object store.

use crate::errors::LoadError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::path::PathBuf;
use std::time::Duration;

/// Raw artifact bytes plus where they were read from
#[derive(Debug, Clone)]
pub struct Artifact {
    pub location: String,
    pub bytes: Bytes,
}

/// One entry of a source listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    pub name: String,
    pub size_bytes: u64,
}

/// Backend that resolves artifact file names to bytes
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Human readable location of a file, used for logs and slot state
    fn locate(&self, file_name: &str) -> String;

    /// Read the artifact
    async fn fetch(&self, file_name: &str) -> Result<Artifact, LoadError>;

    /// Artifacts available at the source, if it can be listed
    async fn inventory(&self) -> Vec<ArtifactEntry> {
        Vec::new()
    }

    /// Short description for startup logs
    fn describe(&self) -> String;
}

/// Model directory on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalArtifactSource {
    dir: PathBuf,
}

impl LocalArtifactSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ArtifactSource for LocalArtifactSource {
    fn locate(&self, file_name: &str) -> String {
        self.dir.join(file_name).display().to_string()
    }

    async fn fetch(&self, file_name: &str) -> Result<Artifact, LoadError> {
        let path = self.dir.join(file_name);
        let location = path.display().to_string();

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Artifact {
                location,
                bytes: Bytes::from(bytes),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(LoadError::NotFound { location })
            }
            Err(e) => Err(LoadError::Unreadable {
                location,
                reason: e.to_string(),
            }),
        }
    }

    async fn inventory(&self) -> Vec<ArtifactEntry> {
        let mut entries = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(_) => return entries,
        };

        while let Ok(Some(entry)) = dir.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let size_bytes = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta.len(),
                _ => continue,
            };
            entries.push(ArtifactEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size_bytes,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    fn describe(&self) -> String {
        format!("directory {}", self.dir.display())
    }
}

/// Artifacts served over HTTP as `<base_url>/<file_name>`
#[derive(Debug, Clone)]
pub struct HttpArtifactSource {
    client: Client,
    base_url: String,
}

impl HttpArtifactSource {
    /// Create a source with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LoadError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::Unreadable {
                location: base_url.clone(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl ArtifactSource for HttpArtifactSource {
    fn locate(&self, file_name: &str) -> String {
        format!("{}/{}", self.base_url, file_name)
    }

    async fn fetch(&self, file_name: &str) -> Result<Artifact, LoadError> {
        let location = self.locate(file_name);

        let response = self
            .client
            .get(&location)
            .send()
            .await
            .map_err(|e| LoadError::Unreadable {
                location: location.clone(),
                reason: format!("Failed to connect: {}", e),
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LoadError::NotFound { location });
        }
        if !response.status().is_success() {
            return Err(LoadError::Unreadable {
                reason: format!("HTTP {}", response.status()),
                location,
            });
        }

        let bytes = response.bytes().await.map_err(|e| LoadError::Unreadable {
            location: location.clone(),
            reason: format!("Failed to read body: {}", e),
        })?;

        Ok(Artifact { location, bytes })
    }

    fn describe(&self) -> String {
        format!("remote store {}", self.base_url)
    }
}
