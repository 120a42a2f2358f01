//! Storage backends for uploaded news images.
//!
//! Two deployments exist: local disk (the default) and a cloud object-storage
//! bucket. Both implement [`ImageStore`], and one of them is picked once at
//! startup and injected into the image service; handlers never branch on the
//! backend themselves.

use crate::services::image_service::ImageError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use reqwest::header::{CONTENT_TYPE, LAST_MODIFIED};
use std::{
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};
use tokio::fs;
use tracing::debug;

/// Minimal capability surface a storage backend must provide.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Whether a file named `name` exists in this store.
    async fn exists(&self, name: &str) -> bool;

    /// Modification time of `name` as epoch milliseconds, if it exists.
    async fn modified_ms(&self, name: &str) -> Option<i64>;

    /// Persist `bytes` under `name` and return the reference to record in the
    /// database. The write is complete and durable when this returns Ok.
    async fn write(&self, name: &str, bytes: Bytes, content_type: &str)
    -> Result<String, ImageError>;
}

/// Local-disk store rooted at a single directory of flat image files.
///
/// `url_prefix` is the rooted URL form under which the directory is served,
/// e.g. `/public/news`; `write` returns `<url_prefix>/<name>`.
#[derive(Clone, Debug)]
pub struct DiskStore {
    root: PathBuf,
    url_prefix: &'static str,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &'static str) -> Self {
        Self {
            root: root.into(),
            url_prefix,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ImageStore for DiskStore {
    async fn exists(&self, name: &str) -> bool {
        fs::metadata(self.root.join(name)).await.is_ok()
    }

    async fn modified_ms(&self, name: &str) -> Option<i64> {
        let meta = fs::metadata(self.root.join(name)).await.ok()?;
        let modified = meta.modified().ok()?;
        let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
        Some(since_epoch.as_millis() as i64)
    }

    async fn write(
        &self,
        name: &str,
        bytes: Bytes,
        _content_type: &str,
    ) -> Result<String, ImageError> {
        fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        fs::write(&path, &bytes).await?;

        // Post-write check: a DB row must never reference a file that is not
        // actually on disk.
        if fs::metadata(&path).await.is_err() {
            return Err(ImageError::WriteNotVisible {
                name: name.to_string(),
            });
        }

        debug!("stored {} bytes at {}", bytes.len(), path.display());
        Ok(format!("{}/{}", self.url_prefix, name))
    }
}

/// Cloud object-storage store.
///
/// Writes objects with a single HTTP PUT to `<endpoint>/<bucket>/<name>` and
/// returns that fully-qualified URL as the stored reference. Reads never go
/// through here: absolute URLs are served to clients as-is.
pub struct BucketStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    token: Option<String>,
}

impl BucketStore {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            token,
        }
    }

    fn object_url(&self, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.bucket,
            name
        )
    }
}

#[async_trait]
impl ImageStore for BucketStore {
    async fn exists(&self, name: &str) -> bool {
        let mut req = self.client.head(self.object_url(name));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        match req.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn modified_ms(&self, name: &str) -> Option<i64> {
        let mut req = self.client.head(self.object_url(name));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let header = resp.headers().get(LAST_MODIFIED)?.to_str().ok()?;
        let parsed = DateTime::parse_from_rfc2822(header).ok()?;
        Some(parsed.timestamp_millis())
    }

    async fn write(
        &self,
        name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, ImageError> {
        let url = self.object_url(name);
        let mut req = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|err| ImageError::Bucket(err.to_string()))?;
        if !resp.status().is_success() {
            return Err(ImageError::Bucket(format!(
                "bucket `{}` returned {} for `{}`",
                self.bucket,
                resp.status(),
                name
            )));
        }

        debug!("uploaded `{}` to bucket `{}`", name, self.bucket);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disk_store_write_creates_dir_and_returns_prefixed_reference() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().join("news"), "/public/news");

        let reference = store
            .write("news-1-1.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();

        assert_eq!(reference, "/public/news/news-1-1.png");
        assert!(store.exists("news-1-1.png").await);
        assert!(store.modified_ms("news-1-1.png").await.unwrap() > 0);
    }

    #[tokio::test]
    async fn disk_store_missing_file_has_no_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path(), "/uploads/news");

        assert!(!store.exists("nope.png").await);
        assert_eq!(store.modified_ms("nope.png").await, None);
    }

    #[test]
    fn bucket_store_builds_object_urls_without_double_slashes() {
        let store = BucketStore::new("https://storage.googleapis.com/", "brighter_day", None);
        assert_eq!(
            store.object_url("news-1-1.jpg"),
            "https://storage.googleapis.com/brighter_day/news-1-1.jpg"
        );
    }
}
