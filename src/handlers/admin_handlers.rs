//! Admin session handlers and the auth guard for protected routes.
//!
//! Sessions are opaque DB-backed tokens carried in an HttpOnly cookie (or a
//! Bearer header for API clients). The guard runs as route-layer middleware
//! on the admin sub-router and injects the authenticated [`AdminId`] into
//! request extensions.

use crate::{errors::AppError, services::news_service::NewsService};
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

/// Cookie name for admin browser sessions.
pub const SESSION_COOKIE: &str = "school_session";

/// Authenticated admin account id, injected by [`require_admin`].
#[derive(Clone, Copy, Debug)]
pub struct AdminId(pub i64);

/// Login request payload.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Pull a session token from the Authorization header or the session cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookies.split(';') {
        if let Some(value) = part.trim().strip_prefix(&format!("{SESSION_COOKIE}=")) {
            return Some(value.to_string());
        }
    }
    None
}

/// Route-layer guard for `/api/admin/*`.
pub async fn require_admin(
    State(service): State<NewsService>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token =
        extract_token(req.headers()).ok_or_else(|| AppError::unauthorized("login required"))?;
    let admin_id = service
        .session_admin(&token)
        .await?
        .ok_or_else(|| AppError::unauthorized("session expired"))?;

    req.extensions_mut().insert(AdminId(admin_id));
    Ok(next.run(req).await)
}

/// POST /admin/login
pub async fn login(
    State(service): State<NewsService>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let (user, session) = service.login(&payload.username, &payload.password).await?;

    let cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.token,
        service.session_hours * 3600
    );
    let mut response = (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Login successful",
            "full_name": user.full_name
        })),
    )
        .into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|_| AppError::internal("invalid cookie value"))?,
    );
    Ok(response)
}

/// POST /admin/logout
pub async fn logout(
    State(service): State<NewsService>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = extract_token(&headers) {
        service.logout(&token).await?;
    }

    let mut response = (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Logged out successfully" })),
    )
        .into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_static("school_session=; Path=/; HttpOnly; Max-Age=0"),
    );
    Ok(response)
}

/// GET /api/admin/stats
pub async fn stats(State(service): State<NewsService>) -> Result<impl IntoResponse, AppError> {
    let stats = service.dashboard_stats().await?;
    Ok(Json(stats))
}
