pub mod book_handlers;
pub mod health_handlers;
pub mod multipart;
pub mod static_handlers;
pub mod video_handlers;
