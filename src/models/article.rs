//! Represents a news article published on the school website.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A news article row, joined with its author's display name.
///
/// `image_url` holds the raw stored reference; the read path replaces it with
/// a resolved, cache-busted URL (or null) before serializing to clients.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Article {
    /// Row id.
    pub id: i64,

    /// Headline shown in lists and on the article page.
    pub title: String,

    /// Free-form category label (e.g. "Academic", "Sports").
    pub category: String,

    /// Short summary shown in article lists.
    pub excerpt: String,

    /// Full HTML body.
    pub content: String,

    /// Stored image reference; absolute URL, rooted path, or null.
    pub image_url: Option<String>,

    /// Admin account that created the article, if still present.
    pub author_id: Option<i64>,

    /// Display name typed by the editor (overrides the account name).
    pub author_name: Option<String>,

    /// Display position/title typed by the editor.
    pub author_position: Option<String>,

    /// Date the article is published under.
    pub published_date: NaiveDate,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Drafts have this unset and are only visible to admins.
    pub is_published: bool,

    /// Public view counter.
    pub views: i64,

    /// Full name of the authoring admin account (join alias).
    pub author: Option<String>,
}
