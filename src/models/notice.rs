//! Represents a short notice shown on the public notice board.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A notice-board entry.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Notice {
    /// Row id.
    pub id: i64,

    /// Notice headline.
    pub title: String,

    /// Notice body text.
    pub description: String,

    /// Font Awesome icon class shown next to the notice.
    pub icon: String,

    /// Higher priority sorts first on the board.
    pub priority: i64,

    /// Inactive notices are hidden from the public board.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Admin account that created the notice, if still present.
    pub author_id: Option<i64>,

    /// Full name of the authoring admin account (join alias).
    pub author: Option<String>,
}
