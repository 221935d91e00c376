//! Books: an uploaded document plus optional cover and tags.

use super::tag::Tag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Public prefix under which cover images are served.
pub const COVER_URL_PREFIX: &str = "/static/covers";

/// A stored book record.
///
/// Paths are relative to the configured upload and cover directories.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Book {
    /// Internal row id.
    pub id: i64,

    /// Short public identifier, unique across books.
    pub uid: String,

    /// Display title.
    pub title: String,

    /// Stored document filename inside the upload directory.
    pub file_path: String,

    /// Declared content type of the document (MIME type).
    pub file_type: String,

    /// Normalized lowercase extension (`pdf`, `epub`).
    pub extension: String,

    /// Cover filename inside the cover directory, if any.
    pub cover_path: Option<String>,

    /// Document size in bytes.
    pub size_bytes: i64,

    /// MD5 hex digest of the document.
    pub checksum: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Associated tags, loaded separately from the join table.
    #[sqlx(skip)]
    pub tags: Vec<Tag>,
}

/// Field set handed to the repository on create and update.
#[derive(Debug, Clone)]
pub struct BookFields {
    pub uid: String,
    pub title: String,
    pub file_path: String,
    pub file_type: String,
    pub extension: String,
    pub cover_path: Option<String>,
    pub size_bytes: i64,
    pub checksum: String,
    /// Tag names; the repository folds them to lowercase.
    pub tags: Vec<String>,
}

impl From<&Book> for BookFields {
    fn from(book: &Book) -> Self {
        Self {
            uid: book.uid.clone(),
            title: book.title.clone(),
            file_path: book.file_path.clone(),
            file_type: book.file_type.clone(),
            extension: book.extension.clone(),
            cover_path: book.cover_path.clone(),
            size_bytes: book.size_bytes,
            checksum: book.checksum.clone(),
            tags: book.tags.iter().map(|t| t.name.clone()).collect(),
        }
    }
}

/// Public listing shape. The raw cover filename is replaced by its URL.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BookRead {
    pub uid: String,
    pub title: String,
    pub file_type: String,
    pub extension: String,
    pub cover_url: Option<String>,
}

/// Public detail shape, including tags.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: BookRead,
    pub tags: Vec<Tag>,
}

pub fn cover_url(cover_path: Option<&str>) -> Option<String> {
    cover_path.map(|name| format!("{COVER_URL_PREFIX}/{name}"))
}

impl From<&Book> for BookRead {
    fn from(book: &Book) -> Self {
        Self {
            uid: book.uid.clone(),
            title: book.title.clone(),
            file_type: book.file_type.clone(),
            extension: book.extension.clone(),
            cover_url: cover_url(book.cover_path.as_deref()),
        }
    }
}

impl From<&Book> for BookDetail {
    fn from(book: &Book) -> Self {
        Self {
            book: BookRead::from(book),
            tags: book.tags.clone(),
        }
    }
}
