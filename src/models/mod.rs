//! Core data models for the school news backend.
//!
//! These entities represent articles, notices, and the admin accounts that
//! manage them. They map cleanly to database tables via `sqlx::FromRow` and
//! serialize naturally as JSON via `serde`.

pub mod admin;
pub mod article;
pub mod notice;
