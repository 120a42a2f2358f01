pub mod image_service;
pub mod news_service;
pub mod storage;
