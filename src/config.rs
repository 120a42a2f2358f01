use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Directory where locally stored news images live (served as /public/news).
    pub public_news_dir: String,
    /// Legacy upload directory, still probed when resolving old references.
    pub uploads_news_dir: String,
    pub database_url: String,
    /// Cloud bucket name; when set, uploads go to the bucket instead of disk.
    pub bucket: Option<String>,
    /// Base URL of the object-storage service hosting the bucket.
    pub bucket_endpoint: String,
    /// Bearer token for bucket writes, read from the environment only.
    pub bucket_token: Option<String>,
    /// Lifetime of admin sessions, in hours.
    pub session_hours: i64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "School news site backend")]
pub struct Args {
    /// Host to bind to (overrides SCHOOL_SITE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides SCHOOL_SITE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory for locally stored news images (overrides SCHOOL_SITE_PUBLIC_NEWS_DIR)
    #[arg(long)]
    pub public_news_dir: Option<String>,

    /// Legacy news upload directory (overrides SCHOOL_SITE_UPLOADS_NEWS_DIR)
    #[arg(long)]
    pub uploads_news_dir: Option<String>,

    /// Database URL (overrides SCHOOL_SITE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Cloud storage bucket for images (overrides SCHOOL_SITE_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("SCHOOL_SITE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("SCHOOL_SITE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing SCHOOL_SITE_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading SCHOOL_SITE_PORT"),
        };
        let env_public =
            env::var("SCHOOL_SITE_PUBLIC_NEWS_DIR").unwrap_or_else(|_| "./public/news".into());
        let env_uploads =
            env::var("SCHOOL_SITE_UPLOADS_NEWS_DIR").unwrap_or_else(|_| "./uploads/news".into());
        let env_db = env::var("SCHOOL_SITE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/school_site.db".into());
        let env_bucket = env::var("SCHOOL_SITE_BUCKET").ok();
        let env_bucket_endpoint = env::var("SCHOOL_SITE_BUCKET_ENDPOINT")
            .unwrap_or_else(|_| "https://storage.googleapis.com".into());
        let env_bucket_token = env::var("SCHOOL_SITE_BUCKET_TOKEN").ok();
        let env_session_hours = match env::var("SCHOOL_SITE_SESSION_HOURS") {
            Ok(value) => value
                .parse::<i64>()
                .with_context(|| format!("parsing SCHOOL_SITE_SESSION_HOURS value `{}`", value))?,
            Err(env::VarError::NotPresent) => 24,
            Err(err) => return Err(err).context("reading SCHOOL_SITE_SESSION_HOURS"),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            public_news_dir: args.public_news_dir.unwrap_or(env_public),
            uploads_news_dir: args.uploads_news_dir.unwrap_or(env_uploads),
            database_url: args.database_url.unwrap_or(env_db),
            bucket: args.bucket.or(env_bucket),
            bucket_endpoint: env_bucket_endpoint,
            bucket_token: env_bucket_token,
            session_hours: env_session_hours,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
