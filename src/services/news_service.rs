//! NewsService — article, notice, and admin-session operations backed by
//! SQLite, with image references funneled through the image service.
//!
//! The service is the single router state: handlers stay thin and delegate
//! all SQL and storage coordination here. On the write path an image upload
//! is stored **before** the row is written, so a storage failure aborts the
//! operation and no row ever references a file that failed to persist.

use crate::{
    models::{
        admin::{AdminUser, Session},
        article::Article,
        notice::Notice,
    },
    services::image_service::{ImageError, ImageService, ImageUpload, normalize_image_ref},
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("article {0} not found")]
    ArticleNotFound(i64),
    #[error("notice {0} not found")]
    NoticeNotFound(i64),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("invalid published_date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("password hash error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type NewsResult<T> = Result<T, NewsError>;

const ARTICLE_COLUMNS: &str = "n.id, n.title, n.category, n.excerpt, n.content, n.image_url, \
     n.author_id, n.author_name, n.author_position, n.published_date, \
     n.created_at, n.updated_at, n.is_published, n.views, \
     a.full_name AS author";

/// Fields for creating or updating an article, minus the image file.
#[derive(Debug, Default, Clone)]
pub struct ArticleInput {
    pub title: String,
    pub category: String,
    pub excerpt: String,
    pub content: String,
    pub published_date: String,
    /// Absent means "published"; an explicit false is kept as false.
    pub is_published: Option<bool>,
    pub author_name: Option<String>,
    pub author_position: Option<String>,
    /// Reference to keep when no new file is uploaded.
    pub existing_image: Option<String>,
}

/// JSON body for creating or updating a notice.
#[derive(Debug, Deserialize)]
pub struct NoticeInput {
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    pub priority: Option<i64>,
    pub is_active: Option<bool>,
}

/// Condensed article row for the admin dashboard.
#[derive(Serialize, FromRow, Debug)]
pub struct RecentArticle {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub published_date: NaiveDate,
    pub views: i64,
}

#[derive(Serialize, Debug)]
pub struct DashboardStats {
    pub news_count: i64,
    pub notices_count: i64,
    pub total_views: i64,
    pub recent_news: Vec<RecentArticle>,
}

#[derive(Clone)]
pub struct NewsService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,

    /// Image normalization, resolution, and upload sink.
    pub images: ImageService,

    /// Lifetime of issued admin sessions, in hours.
    pub session_hours: i64,
}

impl NewsService {
    pub fn new(db: Arc<SqlitePool>, images: ImageService, session_hours: i64) -> Self {
        Self {
            db,
            images,
            session_hours,
        }
    }

    // --- public read path ---

    /// All published articles, newest publication date first, with resolved
    /// image URLs.
    pub async fn list_published_articles(&self) -> NewsResult<Vec<Article>> {
        let query = format!(
            "SELECT {ARTICLE_COLUMNS} FROM news_articles n \
             LEFT JOIN admin_users a ON n.author_id = a.id \
             WHERE n.is_published = 1 \
             ORDER BY n.published_date DESC"
        );
        let mut articles = sqlx::query_as::<_, Article>(&query)
            .fetch_all(&*self.db)
            .await?;
        for article in &mut articles {
            article.image_url = self.images.resolve(article.image_url.as_deref()).await;
        }
        Ok(articles)
    }

    /// A single published article; bumps its view counter.
    pub async fn get_published_article(&self, id: i64) -> NewsResult<Article> {
        let query = format!(
            "SELECT {ARTICLE_COLUMNS} FROM news_articles n \
             LEFT JOIN admin_users a ON n.author_id = a.id \
             WHERE n.id = ? AND n.is_published = 1"
        );
        let mut article = sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or(NewsError::ArticleNotFound(id))?;

        sqlx::query("UPDATE news_articles SET views = views + 1 WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        article.views += 1;

        article.image_url = self.images.resolve(article.image_url.as_deref()).await;
        Ok(article)
    }

    /// Active notices for the public board, highest priority first.
    pub async fn list_active_notices(&self) -> NewsResult<Vec<Notice>> {
        let notices = sqlx::query_as::<_, Notice>(
            "SELECT n.id, n.title, n.description, n.icon, n.priority, n.is_active, \
                    n.created_at, n.updated_at, n.author_id, a.full_name AS author \
             FROM notices n \
             LEFT JOIN admin_users a ON n.author_id = a.id \
             WHERE n.is_active = 1 \
             ORDER BY n.priority DESC, n.created_at DESC \
             LIMIT 10",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(notices)
    }

    // --- admin article path ---

    /// Every article, drafts included, newest first. Raw references are kept
    /// as stored; the admin list does not render images.
    pub async fn list_articles_admin(&self) -> NewsResult<Vec<Article>> {
        let query = format!(
            "SELECT {ARTICLE_COLUMNS} FROM news_articles n \
             LEFT JOIN admin_users a ON n.author_id = a.id \
             ORDER BY n.created_at DESC"
        );
        let articles = sqlx::query_as::<_, Article>(&query)
            .fetch_all(&*self.db)
            .await?;
        Ok(articles)
    }

    /// Create an article. An uploaded image is stored first; only a
    /// successful write produces a reference for the new row.
    pub async fn create_article(
        &self,
        input: ArticleInput,
        image: Option<ImageUpload>,
        admin_id: i64,
    ) -> NewsResult<i64> {
        let image_url = self.image_reference(image, &input.existing_image).await?;
        let published_date = parse_date(&input.published_date)?;
        let now = Utc::now();

        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO news_articles (title, category, excerpt, content, image_url, \
                 author_id, author_name, author_position, published_date, \
                 created_at, updated_at, is_published, views) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0) \
             RETURNING id",
        )
        .bind(&input.title)
        .bind(&input.category)
        .bind(&input.excerpt)
        .bind(&input.content)
        .bind(&image_url)
        .bind(admin_id)
        .bind(&input.author_name)
        .bind(&input.author_position)
        .bind(published_date)
        .bind(now)
        .bind(now)
        .bind(input.is_published.unwrap_or(true))
        .fetch_one(&*self.db)
        .await?;

        debug!("created article {} with image {:?}", id, image_url);
        Ok(id)
    }

    /// Update an article; a new upload replaces the reference, otherwise the
    /// submitted `existing_image` (normalized) is kept.
    pub async fn update_article(
        &self,
        id: i64,
        input: ArticleInput,
        image: Option<ImageUpload>,
    ) -> NewsResult<()> {
        let image_url = self.image_reference(image, &input.existing_image).await?;
        let published_date = parse_date(&input.published_date)?;

        let result = sqlx::query(
            "UPDATE news_articles \
             SET title = ?, category = ?, excerpt = ?, content = ?, image_url = ?, \
                 published_date = ?, is_published = ?, author_name = ?, \
                 author_position = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&input.title)
        .bind(&input.category)
        .bind(&input.excerpt)
        .bind(&input.content)
        .bind(&image_url)
        .bind(published_date)
        .bind(input.is_published.unwrap_or(true))
        .bind(&input.author_name)
        .bind(&input.author_position)
        .bind(Utc::now())
        .bind(id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(NewsError::ArticleNotFound(id));
        }
        Ok(())
    }

    /// Delete an article row. Stored files are not garbage-collected.
    pub async fn delete_article(&self, id: i64) -> NewsResult<()> {
        let result = sqlx::query("DELETE FROM news_articles WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(NewsError::ArticleNotFound(id));
        }
        Ok(())
    }

    async fn image_reference(
        &self,
        image: Option<ImageUpload>,
        existing: &Option<String>,
    ) -> NewsResult<Option<String>> {
        match image {
            Some(upload) => Ok(Some(self.images.store_upload(upload).await?)),
            None => Ok(normalize_image_ref(existing.as_deref())),
        }
    }

    // --- admin notice path ---

    pub async fn list_notices_admin(&self) -> NewsResult<Vec<Notice>> {
        let notices = sqlx::query_as::<_, Notice>(
            "SELECT n.id, n.title, n.description, n.icon, n.priority, n.is_active, \
                    n.created_at, n.updated_at, n.author_id, a.full_name AS author \
             FROM notices n \
             LEFT JOIN admin_users a ON n.author_id = a.id \
             ORDER BY n.created_at DESC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(notices)
    }

    pub async fn create_notice(&self, input: NoticeInput, admin_id: i64) -> NewsResult<i64> {
        let now = Utc::now();
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO notices (title, description, icon, priority, is_active, \
                 created_at, updated_at, author_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING id",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.icon.as_deref().unwrap_or("fa-bullhorn"))
        .bind(input.priority.unwrap_or(0))
        .bind(input.is_active.unwrap_or(true))
        .bind(now)
        .bind(now)
        .bind(admin_id)
        .fetch_one(&*self.db)
        .await?;
        Ok(id)
    }

    pub async fn update_notice(&self, id: i64, input: NoticeInput) -> NewsResult<()> {
        let result = sqlx::query(
            "UPDATE notices \
             SET title = ?, description = ?, icon = ?, priority = ?, is_active = ?, \
                 updated_at = ? \
             WHERE id = ?",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.icon.as_deref().unwrap_or("fa-bullhorn"))
        .bind(input.priority.unwrap_or(0))
        .bind(input.is_active.unwrap_or(true))
        .bind(Utc::now())
        .bind(id)
        .execute(&*self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(NewsError::NoticeNotFound(id));
        }
        Ok(())
    }

    pub async fn delete_notice(&self, id: i64) -> NewsResult<()> {
        let result = sqlx::query("DELETE FROM notices WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(NewsError::NoticeNotFound(id));
        }
        Ok(())
    }

    // --- dashboard ---

    pub async fn dashboard_stats(&self) -> NewsResult<DashboardStats> {
        let news_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM news_articles WHERE is_published = 1",
        )
        .fetch_one(&*self.db)
        .await?;
        let notices_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notices WHERE is_active = 1")
                .fetch_one(&*self.db)
                .await?;
        let total_views =
            sqlx::query_scalar::<_, Option<i64>>("SELECT SUM(views) FROM news_articles")
                .fetch_one(&*self.db)
                .await?
                .unwrap_or(0);
        let recent_news = sqlx::query_as::<_, RecentArticle>(
            "SELECT id, title, category, published_date, views \
             FROM news_articles ORDER BY created_at DESC LIMIT 5",
        )
        .fetch_all(&*self.db)
        .await?;

        Ok(DashboardStats {
            news_count,
            notices_count,
            total_views,
            recent_news,
        })
    }

    // --- sessions ---

    /// Verify credentials and open a session. Failures are collapsed into
    /// `InvalidCredentials` so the response does not leak which part failed.
    pub async fn login(&self, username: &str, password: &str) -> NewsResult<(AdminUser, Session)> {
        let user = sqlx::query_as::<_, AdminUser>(
            "SELECT id, username, password, full_name, email, created_at, last_login, is_active \
             FROM admin_users WHERE username = ? AND is_active = 1",
        )
        .bind(username)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(NewsError::InvalidCredentials)?;

        if !bcrypt::verify(password, &user.password)? {
            return Err(NewsError::InvalidCredentials);
        }

        let now = Utc::now();
        sqlx::query("UPDATE admin_users SET last_login = ? WHERE id = ?")
            .bind(now)
            .bind(user.id)
            .execute(&*self.db)
            .await?;

        let session = Session {
            token: Uuid::new_v4().to_string(),
            admin_id: user.id,
            created_at: now,
            expires_at: now + Duration::hours(self.session_hours),
        };
        sqlx::query(
            "INSERT INTO sessions (token, admin_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(session.admin_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&*self.db)
        .await?;

        debug!("opened session for admin {}", user.id);
        Ok((user, session))
    }

    /// Admin id for a session token, or None if unknown or expired.
    /// Expired sessions are deleted on sight.
    pub async fn session_admin(&self, token: &str) -> NewsResult<Option<i64>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT token, admin_id, created_at, expires_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&*self.db)
        .await?;

        match session {
            Some(session) if session.expires_at > Utc::now() => Ok(Some(session.admin_id)),
            Some(session) => {
                sqlx::query("DELETE FROM sessions WHERE token = ?")
                    .bind(&session.token)
                    .execute(&*self.db)
                    .await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn logout(&self, token: &str) -> NewsResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&*self.db)
            .await?;
        Ok(())
    }
}

fn parse_date(value: &str) -> NewsResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| NewsError::InvalidDate(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::DiskStore;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;

    struct Fixture {
        service: NewsService,
        _uploads: TempDir,
        _public: TempDir,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .unwrap(),
        );
        let sql = include_str!("../../migrations/0001_init.sql");
        for stmt in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(stmt).execute(&*db).await.unwrap();
        }

        let uploads = TempDir::new().unwrap();
        let public = TempDir::new().unwrap();
        let sink = Arc::new(DiskStore::new(public.path(), "/public/news"));
        let images = ImageService::new(uploads.path(), public.path(), sink);

        Fixture {
            service: NewsService::new(db, images, 24),
            _uploads: uploads,
            _public: public,
        }
    }

    fn article_input(title: &str) -> ArticleInput {
        ArticleInput {
            title: title.to_string(),
            category: "Academic".to_string(),
            excerpt: "excerpt".to_string(),
            content: "<p>content</p>".to_string(),
            published_date: "2026-08-30".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn explicit_draft_flag_is_kept() {
        let fx = fixture().await;
        let mut input = article_input("Draft");
        input.is_published = Some(false);

        let id = fx.service.create_article(input, None, 1).await.unwrap();

        // Draft is invisible publicly but listed for admins.
        assert!(matches!(
            fx.service.get_published_article(id).await,
            Err(NewsError::ArticleNotFound(_))
        ));
        let all = fx.service.list_articles_admin().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].is_published);
    }

    #[tokio::test]
    async fn absent_publish_flag_defaults_to_published() {
        let fx = fixture().await;
        let id = fx
            .service
            .create_article(article_input("Live"), None, 1)
            .await
            .unwrap();
        let article = fx.service.get_published_article(id).await.unwrap();
        assert!(article.is_published);
        assert_eq!(article.author.as_deref(), Some("System Administrator"));
    }

    #[tokio::test]
    async fn reading_an_article_increments_views() {
        let fx = fixture().await;
        let id = fx
            .service
            .create_article(article_input("Viewed"), None, 1)
            .await
            .unwrap();

        let first = fx.service.get_published_article(id).await.unwrap();
        let second = fx.service.get_published_article(id).await.unwrap();
        assert_eq!(first.views, 1);
        assert_eq!(second.views, 2);
    }

    #[tokio::test]
    async fn existing_image_reference_is_normalized_on_write() {
        let fx = fixture().await;
        let mut input = article_input("Legacy image");
        input.existing_image = Some("news/old.png".to_string());

        let id = fx.service.create_article(input, None, 1).await.unwrap();
        let all = fx.service.list_articles_admin().await.unwrap();
        let stored = all.iter().find(|a| a.id == id).unwrap();
        assert_eq!(stored.image_url.as_deref(), Some("/uploads/news/old.png"));
    }

    #[tokio::test]
    async fn bad_published_date_is_rejected() {
        let fx = fixture().await;
        let mut input = article_input("Bad date");
        input.published_date = "30/08/2026".to_string();
        assert!(matches!(
            fx.service.create_article(input, None, 1).await,
            Err(NewsError::InvalidDate(_))
        ));
    }

    #[tokio::test]
    async fn login_issues_session_and_rejects_bad_password() {
        let fx = fixture().await;
        let hash = bcrypt::hash("s3cret", bcrypt::DEFAULT_COST).unwrap();
        sqlx::query("INSERT INTO admin_users (username, password, full_name) VALUES (?, ?, ?)")
            .bind("editor")
            .bind(&hash)
            .bind("News Editor")
            .execute(&*fx.service.db)
            .await
            .unwrap();

        assert!(matches!(
            fx.service.login("editor", "wrong").await,
            Err(NewsError::InvalidCredentials)
        ));

        let (user, session) = fx.service.login("editor", "s3cret").await.unwrap();
        assert_eq!(user.username, "editor");
        let admin = fx.service.session_admin(&session.token).await.unwrap();
        assert_eq!(admin, Some(user.id));

        fx.service.logout(&session.token).await.unwrap();
        assert_eq!(fx.service.session_admin(&session.token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected_and_removed() {
        let fx = fixture().await;
        let past = Utc::now() - Duration::hours(1);
        sqlx::query(
            "INSERT INTO sessions (token, admin_id, created_at, expires_at) VALUES (?, 1, ?, ?)",
        )
        .bind("stale-token")
        .bind(past)
        .bind(past)
        .execute(&*fx.service.db)
        .await
        .unwrap();

        assert_eq!(fx.service.session_admin("stale-token").await.unwrap(), None);
        let remaining =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sessions WHERE token = ?")
                .bind("stale-token")
                .fetch_one(&*fx.service.db)
                .await
                .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn dashboard_stats_count_published_and_active_only() {
        let fx = fixture().await;
        fx.service
            .create_article(article_input("One"), None, 1)
            .await
            .unwrap();
        let mut draft = article_input("Two");
        draft.is_published = Some(false);
        fx.service.create_article(draft, None, 1).await.unwrap();

        let stats = fx.service.dashboard_stats().await.unwrap();
        assert_eq!(stats.news_count, 1);
        // Two seeded notices.
        assert_eq!(stats.notices_count, 2);
        assert_eq!(stats.recent_news.len(), 2);
    }
}
