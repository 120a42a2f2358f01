//! HTTP handlers for public and admin article endpoints.
//!
//! Admin create/update accept a multipart form: text fields plus either an
//! `image` file (persisted through the upload sink before the database write)
//! or an `existing_image` reference string.

use crate::{
    errors::AppError,
    handlers::admin_handlers::AdminId,
    services::{
        image_service::ImageUpload,
        news_service::{ArticleInput, NewsService},
    },
};
use axum::{
    Json,
    extract::{Extension, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

/// GET /api/articles
pub async fn list_articles(
    State(service): State<NewsService>,
) -> Result<impl IntoResponse, AppError> {
    let articles = service.list_published_articles().await?;
    Ok(Json(articles))
}

/// GET /api/articles/{id}
pub async fn get_article(
    State(service): State<NewsService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let article = service.get_published_article(id).await?;
    Ok(Json(article))
}

/// GET /api/admin/articles
pub async fn list_articles_admin(
    State(service): State<NewsService>,
) -> Result<impl IntoResponse, AppError> {
    let articles = service.list_articles_admin().await?;
    Ok(Json(articles))
}

/// POST /api/admin/articles — multipart form with optional image file.
pub async fn create_article(
    State(service): State<NewsService>,
    Extension(AdminId(admin_id)): Extension<AdminId>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (input, image) = read_article_form(multipart).await?;
    let id = service.create_article(input, image, admin_id).await?;
    Ok(Json(json!({
        "success": true,
        "id": id,
        "message": "Article created successfully"
    })))
}

/// PUT /api/admin/articles/{id}
pub async fn update_article(
    State(service): State<NewsService>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (input, image) = read_article_form(multipart).await?;
    service.update_article(id, input, image).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Article updated successfully"
    })))
}

/// DELETE /api/admin/articles/{id}
pub async fn delete_article(
    State(service): State<NewsService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_article(id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Article deleted successfully"
    })))
}

/// Collect the article multipart form into typed input plus an optional
/// image upload. Unknown fields are ignored.
async fn read_article_form(
    mut multipart: Multipart,
) -> Result<(ArticleInput, Option<ImageUpload>), AppError> {
    let mut input = ArticleInput::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let original_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(bad_multipart)?;
            // Browsers submit an empty part when no file was chosen.
            if !bytes.is_empty() {
                image = Some(ImageUpload {
                    bytes,
                    original_name,
                    content_type,
                });
            }
            continue;
        }

        let text = field.text().await.map_err(bad_multipart)?;
        match name.as_str() {
            "title" => input.title = text,
            "category" => input.category = text,
            "excerpt" => input.excerpt = text,
            "content" => input.content = text,
            "published_date" => input.published_date = text,
            "is_published" => input.is_published = Some(parse_bool(&text)),
            "author_name" => input.author_name = non_empty(text),
            "author_position" => input.author_position = non_empty(text),
            "existing_image" => input.existing_image = non_empty(text),
            _ => {}
        }
    }

    Ok((input, image))
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "true" | "1" | "on")
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, format!("invalid form data: {err}"))
}
