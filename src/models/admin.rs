//! Represents admin accounts and their login sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An admin panel account.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct AdminUser {
    /// Row id.
    pub id: i64,

    /// Login name, unique.
    pub username: String,

    /// bcrypt hash of the password. Never serialized to clients.
    #[serde(skip_serializing)]
    pub password: String,

    /// Display name used as article author fallback.
    pub full_name: String,

    pub email: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Last successful login, if any.
    pub last_login: Option<DateTime<Utc>>,

    /// Deactivated accounts cannot log in.
    pub is_active: bool,
}

/// A DB-backed admin session, looked up by its opaque token.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Session {
    /// Opaque session token handed to the browser as a cookie.
    pub token: String,

    /// Account this session belongs to.
    pub admin_id: i64,

    pub created_at: DateTime<Utc>,

    /// Sessions past this instant are rejected and deleted on sight.
    pub expires_at: DateTime<Utc>,
}
