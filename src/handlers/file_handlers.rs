//! Serves stored news images from the two local image directories.
//!
//! Streams file bodies instead of buffering them, matching how resolved
//! references point at `/public/news/<file>` and `/uploads/news/<file>`.
//! Only flat filenames are accepted; anything path-like is rejected.

use crate::{errors::AppError, services::news_service::NewsService};
use axum::{
    body::Body,
    extract::{Path as UrlPath, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use std::{io, path::Path};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// GET /public/news/{file}
pub async fn public_news_file(
    State(service): State<NewsService>,
    UrlPath(file): UrlPath<String>,
) -> Result<Response, AppError> {
    serve_image(service.images.public_dir(), &file).await
}

/// GET /uploads/news/{file}
pub async fn uploads_news_file(
    State(service): State<NewsService>,
    UrlPath(file): UrlPath<String>,
) -> Result<Response, AppError> {
    serve_image(service.images.uploads_dir(), &file).await
}

async fn serve_image(dir: &Path, file: &str) -> Result<Response, AppError> {
    if file.contains('/') || file.contains('\\') || file.contains("..") {
        return Err(AppError::bad_request("invalid file name"));
    }

    let path = dir.join(file);
    let handle = File::open(&path).await.map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            AppError::not_found(format!("image `{}` not found", file))
        } else {
            AppError::internal(err.to_string())
        }
    })?;

    let stream = ReaderStream::new(handle);
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(image_content_type(file)),
    );
    Ok(response)
}

fn image_content_type(file: &str) -> &'static str {
    match Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(image_content_type("a.JPG"), "image/jpeg");
        assert_eq!(image_content_type("a.png"), "image/png");
        assert_eq!(image_content_type("a.gif"), "image/gif");
        assert_eq!(image_content_type("a.bin"), "application/octet-stream");
    }
}
