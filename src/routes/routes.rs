//! Route table for the school news backend.
//!
//! ## Structure
//! - **Public endpoints**
//!   - `GET /api/articles` — published articles with resolved image URLs
//!   - `GET /api/articles/{id}` — single article, increments views
//!   - `GET /api/notices` — active notice board entries
//!   - `GET /public/news/{file}`, `GET /uploads/news/{file}` — stored images
//!
//! - **Admin endpoints** (session-guarded via [`require_admin`])
//!   - `POST /admin/login`, `POST /admin/logout`
//!   - `GET  /api/admin/stats`
//!   - `GET/POST /api/admin/articles`, `PUT/DELETE /api/admin/articles/{id}`
//!   - `GET/POST /api/admin/notices`, `PUT/DELETE /api/admin/notices/{id}`

use crate::handlers::{
    admin_handlers::{login, logout, require_admin, stats},
    article_handlers::{
        create_article, delete_article, get_article, list_articles, list_articles_admin,
        update_article,
    },
    file_handlers::{public_news_file, uploads_news_file},
    health_handlers::{healthz, readyz},
    notice_handlers::{create_notice, delete_notice, list_notices, list_notices_admin,
        update_notice},
};
use crate::services::news_service::NewsService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};

/// Upload requests may exceed the image limit; oversize images are rejected
/// by the sink with 413 rather than cut off at the transport.
const MAX_REQUEST_BYTES: usize = 32 * 1024 * 1024;

/// Build the full application router with shared [`NewsService`] state.
pub fn routes(service: NewsService) -> Router {
    let admin_api = Router::new()
        .route(
            "/api/admin/articles",
            get(list_articles_admin).post(create_article),
        )
        .route(
            "/api/admin/articles/{id}",
            put(update_article).delete(delete_article),
        )
        .route(
            "/api/admin/notices",
            get(list_notices_admin).post(create_notice),
        )
        .route(
            "/api/admin/notices/{id}",
            put(update_notice).delete(delete_notice),
        )
        .route("/api/admin/stats", get(stats))
        .route_layer(middleware::from_fn_with_state(
            service.clone(),
            require_admin,
        ));

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // public news API
        .route("/api/articles", get(list_articles))
        .route("/api/articles/{id}", get(get_article))
        .route("/api/notices", get(list_notices))
        // stored images
        .route("/public/news/{file}", get(public_news_file))
        .route("/uploads/news/{file}", get(uploads_news_file))
        // admin session endpoints
        .route("/admin/login", post(login))
        .route("/admin/logout", post(logout))
        .merge(admin_api)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(service)
}
