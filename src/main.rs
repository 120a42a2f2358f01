use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{
    image_service::ImageService,
    news_service::NewsService,
    storage::{BucketStore, DiskStore, ImageStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting school-site with config: {:?}", cfg);

    // --- Ensure image directories exist ---
    for dir in [&cfg.public_news_dir, &cfg.uploads_news_dir] {
        if !Path::new(dir).exists() {
            fs::create_dir_all(dir)?;
            tracing::info!("Created image directory at {}", dir);
        }
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    tracing::debug!("Connecting using raw URL => {}", db_url);

    // Extract the local file path SQLx will use
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    let db_path_obj = Path::new(db_path);

    // Create parent directory if needed
    if let Some(parent) = db_path_obj.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // SQLx will not create the database file on its own
    if !db_path_obj.exists() {
        match fs::OpenOptions::new().create(true).write(true).open(db_path) {
            Ok(_) => tracing::debug!("Created empty database file at {}", db_path),
            Err(e) => tracing::warn!("Failed to create database file: {}", e),
        }
    }

    let db: Arc<sqlx::Pool<sqlx::Sqlite>> = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?,
    );

    // --- Handle migration mode ---
    if migrate {
        run_migrations(&db).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize core services ---
    let sink: Arc<dyn ImageStore> = match &cfg.bucket {
        Some(bucket) => {
            tracing::info!("Image uploads go to bucket `{}`", bucket);
            Arc::new(BucketStore::new(
                cfg.bucket_endpoint.clone(),
                bucket.clone(),
                cfg.bucket_token.clone(),
            ))
        }
        None => {
            tracing::info!("Image uploads go to local disk at {}", cfg.public_news_dir);
            Arc::new(DiskStore::new(&cfg.public_news_dir, "/public/news"))
        }
    };
    let images = ImageService::new(&cfg.uploads_news_dir, &cfg.public_news_dir, sink);
    let service = NewsService::new(db, images, cfg.session_hours);

    // --- Build router ---
    let app = routes::routes::routes(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run SQLite migrations manually from the embedded SQL file.
async fn run_migrations(db: &Arc<sqlx::Pool<sqlx::Sqlite>>) -> Result<()> {
    let path = "migrations/0001_init.sql";

    if !Path::new(path).exists() {
        anyhow::bail!("Migration file not found: {}", path);
    }

    let sql = fs::read_to_string(path)?;
    let statements = sql
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(&**db).await?;
    }

    Ok(())
}
