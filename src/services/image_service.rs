//! Image reference handling for news articles.
//!
//! An article row stores a single `image_url` string that has taken several
//! shapes over the site's life: absolute bucket URLs, `/uploads/news/...`
//! paths, `/public/news/...` paths, and bare filenames. This module owns the
//! whole pipeline around that string:
//!
//! - [`normalize_image_ref`] maps any historical form to one canonical rooted
//!   path (pure, no I/O);
//! - [`ImageService::resolve`] turns a stored reference into a servable URL
//!   with a cache-busting `?v=` marker, probing the local directories and
//!   returning `None` when no backend has the file;
//! - [`ImageService::store_upload`] validates and persists a new upload
//!   through the configured [`ImageStore`] backend.

use crate::services::storage::{DiskStore, ImageStore};
use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use std::{io, path::Path, sync::Arc};
use thiserror::Error;

/// Uploads larger than this are rejected before any storage write.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_IMAGE_TYPES: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

const UPLOADS_NEWS_PREFIX: &str = "/uploads/news/";
const PUBLIC_NEWS_PREFIX: &str = "/public/news/";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported image type `{content_type}` for `{name}` (jpeg, jpg, png, gif allowed)")]
    UnsupportedMediaType { name: String, content_type: String },
    #[error("image is {size} bytes, limit is {limit}")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("stored image `{name}` missing after write")]
    WriteNotVisible { name: String },
    #[error("bucket write failed: {0}")]
    Bucket(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// An uploaded image file, as received from the multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub original_name: String,
    pub content_type: String,
}

impl ImageUpload {
    fn extension(&self) -> Option<String> {
        Path::new(&self.original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Validate size, declared MIME type, and file extension. Both the MIME
    /// subtype and the extension must be in the allowed set.
    fn validate(&self) -> Result<(), ImageError> {
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::PayloadTooLarge {
                size: self.bytes.len(),
                limit: MAX_IMAGE_BYTES,
            });
        }

        let subtype = self
            .content_type
            .strip_prefix("image/")
            .unwrap_or("")
            .to_ascii_lowercase();
        let mime_ok = ALLOWED_IMAGE_TYPES.contains(&subtype.as_str());
        let ext_ok = self
            .extension()
            .is_some_and(|ext| ALLOWED_IMAGE_TYPES.contains(&ext.as_str()));

        if mime_ok && ext_ok {
            Ok(())
        } else {
            Err(ImageError::UnsupportedMediaType {
                name: self.original_name.clone(),
                content_type: self.content_type.clone(),
            })
        }
    }
}

/// True for `http://` and `https://` inputs, scheme case-insensitive.
fn is_absolute_url(value: &str) -> bool {
    let scheme_ok = |prefix: &str| {
        value
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    scheme_ok("http://") || scheme_ok("https://")
}

/// Map a raw stored reference to its canonical form.
///
/// Absolute URLs pass through unchanged. Everything else is rewritten to a
/// rooted path, folding the legacy `news/` layout into `/uploads/news/`.
/// Pure and idempotent; never fails — unparseable input falls through to a
/// best-effort single-leading-slash form.
pub fn normalize_image_ref(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }

    if is_absolute_url(trimmed) {
        return Some(trimmed.to_string());
    }

    let cleaned = trimmed.replace('\\', "/");
    let cleaned = cleaned.strip_prefix("./").unwrap_or(&cleaned);

    // First match wins.
    if cleaned.starts_with("/uploads/") || cleaned.starts_with("/public/") {
        return Some(cleaned.to_string());
    }
    if cleaned.starts_with("uploads/") || cleaned.starts_with("public/") {
        return Some(format!("/{cleaned}"));
    }
    if cleaned.starts_with("/news/") {
        return Some(format!("/uploads{cleaned}"));
    }
    if cleaned.starts_with("news/") {
        return Some(format!("/uploads/{cleaned}"));
    }

    if cleaned.starts_with('/') {
        Some(cleaned.to_string())
    } else {
        Some(format!("/{cleaned}"))
    }
}

/// Collision-resistant name for a stored upload: fixed prefix, creation
/// timestamp, random suffix, original extension.
fn unique_image_name(original_name: &str) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    match Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(ext) => format!("news-{}-{}.{}", timestamp, suffix, ext.to_ascii_lowercase()),
        None => format!("news-{}-{}", timestamp, suffix),
    }
}

/// Resolver and upload sink over the configured storage backend.
///
/// The two disk probes always point at the local directories regardless of
/// which backend handles new uploads: legacy disk-stored references must keep
/// resolving even after a deployment switches to the bucket.
#[derive(Clone)]
pub struct ImageService {
    uploads: DiskStore,
    public: DiskStore,
    sink: Arc<dyn ImageStore>,
}

impl ImageService {
    pub fn new(
        uploads_news_dir: impl Into<std::path::PathBuf>,
        public_news_dir: impl Into<std::path::PathBuf>,
        sink: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            uploads: DiskStore::new(uploads_news_dir, "/uploads/news"),
            public: DiskStore::new(public_news_dir, "/public/news"),
            sink,
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        self.uploads.root()
    }

    pub fn public_dir(&self) -> &Path {
        self.public.root()
    }

    /// Resolve a stored reference into a client-facing URL.
    ///
    /// Absolute URLs are trusted without an existence check. Local references
    /// are probed on disk and get a `?v=<mtime-ms>` freshness marker, so
    /// caches refetch after an in-place replacement. References under
    /// `/uploads/news/` fall back to the public directory before giving up.
    /// Unresolvable references yield `None`, never an error.
    pub async fn resolve(&self, raw: Option<&str>) -> Option<String> {
        let normalized = normalize_image_ref(raw)?;
        if is_absolute_url(&normalized) {
            return Some(normalized);
        }

        if normalized.starts_with(PUBLIC_NEWS_PREFIX) {
            // Terminal: no fallback for the public form.
            let name = basename(&normalized);
            let version = self.public.modified_ms(name).await?;
            return Some(format!("{normalized}?v={version}"));
        }

        if normalized.starts_with(UPLOADS_NEWS_PREFIX) {
            let name = basename(&normalized);
            if let Some(version) = self.uploads.modified_ms(name).await {
                return Some(format!("{normalized}?v={version}"));
            }
            if let Some(version) = self.public.modified_ms(name).await {
                return Some(format!("{PUBLIC_NEWS_PREFIX}{name}?v={version}"));
            }
            return None;
        }

        // Paths outside the two known roots are passed through untouched.
        Some(normalized)
    }

    /// Validate and persist an uploaded image, returning the reference to
    /// store in the article row. Nothing is written for invalid uploads, and
    /// a storage failure here must abort the surrounding database write.
    pub async fn store_upload(&self, upload: ImageUpload) -> Result<String, ImageError> {
        upload.validate()?;
        let name = unique_image_name(&upload.original_name);
        self.sink
            .write(&name, upload.bytes, &upload.content_type)
            .await
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn service(uploads: &TempDir, public: &TempDir) -> ImageService {
        let sink = Arc::new(DiskStore::new(public.path(), "/public/news"));
        ImageService::new(uploads.path(), public.path(), sink)
    }

    fn upload(name: &str, content_type: &str, len: usize) -> ImageUpload {
        ImageUpload {
            bytes: Bytes::from(vec![0u8; len]),
            original_name: name.to_string(),
            content_type: content_type.to_string(),
        }
    }

    #[test]
    fn normalize_passes_absolute_urls_through() {
        for url in [
            "https://storage.googleapis.com/brighter_day/news-1.png",
            "http://example.com/a.jpg",
            "HTTPS://example.com/a.jpg",
        ] {
            assert_eq!(normalize_image_ref(Some(url)).as_deref(), Some(url));
        }
    }

    #[test]
    fn normalize_rejects_empty_input() {
        assert_eq!(normalize_image_ref(None), None);
        assert_eq!(normalize_image_ref(Some("")), None);
        assert_eq!(normalize_image_ref(Some("   ")), None);
    }

    #[test]
    fn normalize_roots_known_prefixes() {
        let cases = [
            ("/uploads/news/a.png", "/uploads/news/a.png"),
            ("/public/news/a.png", "/public/news/a.png"),
            ("uploads/news/a.png", "/uploads/news/a.png"),
            ("public/news/a.png", "/public/news/a.png"),
            ("/news/a.png", "/uploads/news/a.png"),
            ("news/a.png", "/uploads/news/a.png"),
            ("a.png", "/a.png"),
            ("./news/a.png", "/uploads/news/a.png"),
            ("news\\a.png", "/uploads/news/a.png"),
        ];
        for (input, expected) in cases {
            assert_eq!(
                normalize_image_ref(Some(input)).as_deref(),
                Some(expected),
                "input: {input}"
            );
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "news/a.png",
            "/news/a.png",
            "uploads/news/a.png",
            "public/news/a.png",
            "a.png",
            "weird\\path.gif",
            "https://example.com/x.png",
        ];
        for input in inputs {
            let once = normalize_image_ref(Some(input)).unwrap();
            let twice = normalize_image_ref(Some(once.as_str())).unwrap();
            assert_eq!(once, twice, "input: {input}");
        }
    }

    #[tokio::test]
    async fn resolve_returns_absolute_urls_without_probing() {
        // Directories that do not exist: any probe would fail loudly.
        let missing = PathBuf::from("/definitely/not/here");
        let sink = Arc::new(DiskStore::new(&missing, "/public/news"));
        let svc = ImageService::new(&missing, &missing, sink);

        let url = "https://storage.googleapis.com/brighter_day/news-1.png";
        assert_eq!(svc.resolve(Some(url)).await.as_deref(), Some(url));
    }

    #[tokio::test]
    async fn resolve_appends_numeric_freshness_marker() {
        let uploads = TempDir::new().unwrap();
        let public = TempDir::new().unwrap();
        std::fs::write(uploads.path().join("a.png"), b"png").unwrap();

        let svc = service(&uploads, &public);
        let resolved = svc.resolve(Some("news/a.png")).await.unwrap();

        let (path, version) = resolved.split_once("?v=").unwrap();
        assert_eq!(path, "/uploads/news/a.png");
        assert!(!version.is_empty());
        assert!(version.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn resolve_falls_back_from_uploads_to_public() {
        let uploads = TempDir::new().unwrap();
        let public = TempDir::new().unwrap();
        std::fs::write(public.path().join("a.png"), b"png").unwrap();

        let svc = service(&uploads, &public);
        let resolved = svc.resolve(Some("/uploads/news/a.png")).await.unwrap();
        assert!(resolved.starts_with("/public/news/a.png?v="));
    }

    #[tokio::test]
    async fn resolve_misses_in_both_roots_yield_none() {
        let uploads = TempDir::new().unwrap();
        let public = TempDir::new().unwrap();
        let svc = service(&uploads, &public);

        assert_eq!(svc.resolve(Some("/uploads/news/gone.png")).await, None);
    }

    #[tokio::test]
    async fn resolve_public_form_has_no_fallback() {
        let uploads = TempDir::new().unwrap();
        let public = TempDir::new().unwrap();
        std::fs::write(uploads.path().join("a.png"), b"png").unwrap();

        let svc = service(&uploads, &public);
        assert_eq!(svc.resolve(Some("/public/news/a.png")).await, None);
    }

    #[tokio::test]
    async fn resolve_passes_unknown_roots_through() {
        let uploads = TempDir::new().unwrap();
        let public = TempDir::new().unwrap();
        let svc = service(&uploads, &public);

        assert_eq!(
            svc.resolve(Some("/banners/hero.png")).await.as_deref(),
            Some("/banners/hero.png")
        );
    }

    #[tokio::test]
    async fn store_rejects_extension_mime_mismatch() {
        let uploads = TempDir::new().unwrap();
        let public = TempDir::new().unwrap();
        let svc = service(&uploads, &public);

        let err = svc
            .store_upload(upload("notes.txt", "image/png", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::UnsupportedMediaType { .. }));
    }

    #[tokio::test]
    async fn store_rejects_oversized_upload_before_writing() {
        let uploads = TempDir::new().unwrap();
        let public = TempDir::new().unwrap();
        let svc = service(&uploads, &public);

        let err = svc
            .store_upload(upload("big.jpg", "image/jpeg", 6 * 1024 * 1024))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::PayloadTooLarge { .. }));
        assert_eq!(std::fs::read_dir(public.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn stored_upload_resolves_with_freshness_marker() {
        let uploads = TempDir::new().unwrap();
        let public = TempDir::new().unwrap();
        let svc = service(&uploads, &public);

        let reference = svc
            .store_upload(upload("photo.PNG", "image/png", 1024 * 1024))
            .await
            .unwrap();
        assert!(reference.starts_with("/public/news/news-"));
        assert!(reference.ends_with(".png"));

        let resolved = svc.resolve(Some(reference.as_str())).await.unwrap();
        let (path, version) = resolved.split_once("?v=").unwrap();
        assert_eq!(path, reference);

        let name = path.rsplit('/').next().unwrap();
        let on_disk = std::fs::metadata(public.path().join(name)).unwrap();
        let mtime_ms = on_disk
            .modified()
            .unwrap()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis();
        assert_eq!(version.parse::<u128>().unwrap(), mtime_ms);
    }
}
