//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks DB connectivity and image-dir I/O

use crate::services::news_service::NewsService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::HashMap, path::Path};
use tokio::fs;
use uuid::Uuid;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: HashMap<&'static str, CheckStatus>,
}

/// `GET /healthz`
///
/// Liveness probe. Cheap, never performs I/O.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz`
///
/// Readiness probe: `SELECT 1` against SQLite plus a write/read/delete round
/// trip in each local image directory. 200 when everything passes, 503
/// otherwise, with per-check detail in the body.
pub async fn readyz(State(service): State<NewsService>) -> impl IntoResponse {
    let sqlite = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*service.db)
        .await
    {
        Ok(1) => CheckStatus {
            ok: true,
            error: None,
        },
        Ok(v) => CheckStatus {
            ok: false,
            error: Some(format!("unexpected result: {}", v)),
        },
        Err(e) => CheckStatus {
            ok: false,
            error: Some(e.to_string()),
        },
    };

    let public = dir_round_trip(service.images.public_dir()).await;
    let uploads = dir_round_trip(service.images.uploads_dir()).await;

    let checks: HashMap<_, _> = [
        ("sqlite", sqlite),
        ("public_dir", public),
        ("uploads_dir", uploads),
    ]
    .into_iter()
    .collect();

    let ok = checks.values().all(|check| check.ok);
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadyResponse {
            status: if ok { "ok" } else { "error" },
            checks,
        }),
    )
}

/// Write, read back, and delete a probe file under `dir`.
async fn dir_round_trip(dir: &Path) -> CheckStatus {
    let tmp = dir.join(format!(".readyz-{}", Uuid::new_v4()));
    let result = async {
        fs::write(&tmp, b"readyz").await?;
        let bytes = fs::read(&tmp).await?;
        if bytes != b"readyz" {
            return Err(std::io::Error::other("probe content mismatch"));
        }
        Ok(())
    }
    .await;

    // Cleanup is best-effort either way.
    let _ = fs::remove_file(&tmp).await;

    match result {
        Ok(()) => CheckStatus {
            ok: true,
            error: None,
        },
        Err(e) => CheckStatus {
            ok: false,
            error: Some(e.to_string()),
        },
    }
}
