//! HTTP handlers for public and admin notice endpoints.

use crate::{
    errors::AppError,
    handlers::admin_handlers::AdminId,
    services::news_service::{NewsService, NoticeInput},
};
use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use serde_json::json;

/// GET /api/notices
pub async fn list_notices(
    State(service): State<NewsService>,
) -> Result<impl IntoResponse, AppError> {
    let notices = service.list_active_notices().await?;
    Ok(Json(notices))
}

/// GET /api/admin/notices
pub async fn list_notices_admin(
    State(service): State<NewsService>,
) -> Result<impl IntoResponse, AppError> {
    let notices = service.list_notices_admin().await?;
    Ok(Json(notices))
}

/// POST /api/admin/notices
pub async fn create_notice(
    State(service): State<NewsService>,
    Extension(AdminId(admin_id)): Extension<AdminId>,
    Json(input): Json<NoticeInput>,
) -> Result<impl IntoResponse, AppError> {
    let id = service.create_notice(input, admin_id).await?;
    Ok(Json(json!({
        "success": true,
        "id": id,
        "message": "Notice created successfully"
    })))
}

/// PUT /api/admin/notices/{id}
pub async fn update_notice(
    State(service): State<NewsService>,
    Path(id): Path<i64>,
    Json(input): Json<NoticeInput>,
) -> Result<impl IntoResponse, AppError> {
    service.update_notice(id, input).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Notice updated successfully"
    })))
}

/// DELETE /api/admin/notices/{id}
pub async fn delete_notice(
    State(service): State<NewsService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_notice(id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Notice deleted successfully"
    })))
}
