use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use super::PublishError;

/// Somewhere public files can be written to.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `content` at `path`, overwriting anything already there, and returns its public URL.
    async fn put(&self, path: &str, content: Vec<u8>, content_type: &str)
        -> Result<String, PublishError>;
}

/// A hosted blob store reached over HTTP with a read-write token.
pub struct HttpBlobStore {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

#[derive(Deserialize)]
struct PutBlobResponse {
    url: String,
}

impl HttpBlobStore {
    pub const DEFAULT_API_URL: &'static str = "https://blob.vercel-storage.com";

    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_owned(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(
        &self,
        path: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<String, PublishError> {
        let path = clean_path(path)?;
        let response = self
            .client
            .put(format!("{}/{}", self.api_url, path.to_string_lossy()))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header("x-api-version", "7")
            .header("x-content-type", content_type)
            .header(CONTENT_TYPE, content_type)
            .header("x-add-random-suffix", "0")
            .header("x-allow-overwrite", "1")
            .body(content)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let blob: PutBlobResponse = response.json().await?;
        Ok(blob.url)
    }
}

/// Files on local disk, served by this server under `/blob/`.
pub struct LocalBlobStore {
    root: PathBuf,
    public_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        path: &str,
        content: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, PublishError> {
        let relative = clean_path(path)?;
        let full_path = self.root.join(&relative);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, content).await?;

        Ok(format!(
            "{}/blob/{}",
            self.public_url,
            relative.to_string_lossy().replace('\\', "/")
        ))
    }
}

/// Only plain relative paths may be written, so nothing escapes the store's root.
fn clean_path(path: &str) -> Result<PathBuf, PublishError> {
    let given = Path::new(path);
    let mut cleaned = PathBuf::new();
    for component in given.components() {
        match component {
            Component::Normal(part) => cleaned.push(part),
            Component::CurDir => {}
            _ => return Err(PublishError::InvalidPath(path.to_owned())),
        }
    }

    if cleaned.as_os_str().is_empty() {
        Err(PublishError::InvalidPath(path.to_owned()))
    } else {
        Ok(cleaned)
    }
}
