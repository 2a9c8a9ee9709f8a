//! Object storage for submission photos.

use async_trait::async_trait;
use mauri_common::config::StorageConfig;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredPhoto {
    pub key: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("photo storage is not configured")]
    Disabled,

    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload rejected with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, mime: &str) -> Result<StoredPhoto, StorageError>;
}

/// PUTs objects to `{endpoint}/{key}` and serves them from
/// `{public_base_url}/{key}`.
pub struct HttpPhotoStore {
    client: reqwest::Client,
    endpoint: String,
    public_base_url: String,
    token: Option<SecretString>,
}

impl HttpPhotoStore {
    pub fn new(endpoint: &str, public_base_url: Option<&str>, token: Option<SecretString>) -> Self {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let public_base_url = public_base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| endpoint.clone());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client, endpoint, public_base_url, token }
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[async_trait]
impl PhotoStore for HttpPhotoStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, mime: &str) -> Result<StoredPhoto, StorageError> {
        let size = bytes.len();
        let mut request = self
            .client
            .put(format!("{}/{}", self.endpoint, key))
            .header(CONTENT_TYPE, mime)
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Rejected(status.as_u16()));
        }
        tracing::debug!(key, size, "photo uploaded");
        Ok(StoredPhoto { key: key.to_string(), url: self.public_url(key) })
    }
}

/// Used when no storage endpoint is configured. Every put fails, so
/// submissions go through without photos.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPhotoStore;

#[async_trait]
impl PhotoStore for DisabledPhotoStore {
    async fn put(&self, _key: &str, _bytes: Vec<u8>, _mime: &str) -> Result<StoredPhoto, StorageError> {
        Err(StorageError::Disabled)
    }
}

pub fn from_config(config: &StorageConfig) -> Arc<dyn PhotoStore> {
    match config.endpoint.as_deref() {
        Some(endpoint) if config.is_configured() => {
            tracing::info!(endpoint, "photo storage enabled");
            Arc::new(HttpPhotoStore::new(
                endpoint,
                config.public_base_url.as_deref(),
                config
                    .token
                    .as_ref()
                    .map(|t| SecretString::from(t.expose_secret().to_string())),
            ))
        }
        _ => {
            tracing::warn!("photo storage not configured, submitted photos will be dropped");
            Arc::new(DisabledPhotoStore)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_defaults_to_endpoint() {
        let store = HttpPhotoStore::new("https://objects.example.org/bucket/", None, None);
        assert_eq!(
            store.public_url("submissions/1-a.jpg"),
            "https://objects.example.org/bucket/submissions/1-a.jpg"
        );
        let cdn = HttpPhotoStore::new("https://objects.example.org", Some("https://cdn.example.org/"), None);
        assert_eq!(cdn.public_url("k.png"), "https://cdn.example.org/k.png");
    }

    #[tokio::test]
    async fn test_disabled_store_fails() {
        let err = DisabledPhotoStore.put("k", vec![1, 2, 3], "image/png").await.unwrap_err();
        assert!(matches!(err, StorageError::Disabled));
    }
}
