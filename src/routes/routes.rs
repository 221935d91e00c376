//! Defines routes for the library API.
//!
//! ## Structure
//! - **Books**
//!   - `POST   /books/upload`: multipart upload (document, optional cover)
//!   - `GET    /books`: list books
//!   - `GET    /books/{uid}`: book with tags
//!   - `PUT    /books/{uid}`: update title, tags or cover
//!   - `DELETE /books/{uid}`: remove book and its files
//!   - `GET    /tags`: every known tag
//!
//! - **Videos**
//!   - `POST   /videos/upload`, `GET /videos`, `GET /videos/{uid}`
//!   - `GET    /videos/{uid}/stream`: raw video body
//!   - `DELETE /videos/{uid}`
//!
//! - **Static**
//!   - `GET    /static/covers/{name}`: stored cover images

use crate::{
    handlers::{
        book_handlers::{delete_book, get_book, list_books, list_tags, update_book, upload_book},
        health_handlers::{healthz, readyz},
        static_handlers::get_cover,
        video_handlers::{delete_video, get_video, list_videos, stream_video, upload_video},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Build the router. `body_limit` caps every request body; it must cover
/// the largest legitimate multipart upload.
pub fn routes(body_limit: usize) -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // books
        .route("/books/upload", post(upload_book))
        .route("/books", get(list_books))
        .route(
            "/books/{uid}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/tags", get(list_tags))
        // videos
        .route("/videos/upload", post(upload_video))
        .route("/videos", get(list_videos))
        .route("/videos/{uid}", get(get_video).delete(delete_video))
        .route("/videos/{uid}/stream", get(stream_video))
        // static files
        .route("/static/covers/{name}", get(get_cover))
        .layer(DefaultBodyLimit::max(body_limit))
}
