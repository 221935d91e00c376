//! Shared handler state.

use crate::{
    config::IngestConfig,
    repositories::{SqliteBookRepo, SqliteVideoRepo},
    services::{BookService, VideoService},
};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Shared SQLite connection pool, also used by the readiness check.
    pub db: Arc<SqlitePool>,
    pub config: Arc<IngestConfig>,
    pub books: BookService,
    pub videos: VideoService,
}

impl AppState {
    /// Wire the SQLite repositories into both services.
    pub fn new(db: Arc<SqlitePool>, config: IngestConfig) -> Self {
        let config = Arc::new(config);
        let books = BookService::new(Arc::new(SqliteBookRepo::new(db.clone())), config.clone());
        let videos = VideoService::new(Arc::new(SqliteVideoRepo::new(db.clone())), config.clone());
        Self {
            db,
            config,
            books,
            videos,
        }
    }
}
