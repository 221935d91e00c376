//! Persistence collaborators.
//!
//! Services only see the `BookRepository` / `VideoRepository` traits; the
//! SQLite implementations below are what the server wires in.

pub mod book_repo;
pub mod video_repo;

pub use book_repo::{BookRepository, SqliteBookRepo};
pub use video_repo::{SqliteVideoRepo, VideoRepository};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    NotFound(String),
    #[error("identifier `{0}` already exists")]
    DuplicateUid(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Return true if SQLx error indicates a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
