pub mod admin_handlers;
pub mod article_handlers;
pub mod file_handlers;
pub mod health_handlers;
pub mod notice_handlers;
