//! Book persistence over SQLite, with tags kept in a shared table and
//! linked through `book_tags`.

use super::{RepoError, RepoResult, is_unique_violation};
use crate::models::{
    book::{Book, BookFields},
    tag::Tag,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;

#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert a new book. Fails with `DuplicateUid` if the uid is taken.
    async fn create(&self, fields: BookFields) -> RepoResult<Book>;
    async fn find_by_uid(&self, uid: &str) -> RepoResult<Book>;
    async fn list(&self) -> RepoResult<Vec<Book>>;
    /// Replace every field, including the full tag set.
    async fn update(&self, uid: &str, fields: BookFields) -> RepoResult<Book>;
    async fn delete(&self, uid: &str) -> RepoResult<()>;
    async fn list_tags(&self) -> RepoResult<Vec<Tag>>;
}

const SELECT_BOOK: &str = "SELECT id, uid, title, file_path, file_type, extension, cover_path,
        size_bytes, checksum, created_at, updated_at
 FROM books";

#[derive(Clone)]
pub struct SqliteBookRepo {
    db: Arc<SqlitePool>,
}

impl SqliteBookRepo {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    async fn load_tags(&self, book_id: i64) -> RepoResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            "SELECT t.id, t.name FROM tags t
             JOIN book_tags bt ON bt.tag_id = t.id
             WHERE bt.book_id = ?
             ORDER BY t.name",
        )
        .bind(book_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(tags)
    }
}

/// Link `names` to `book_id`, creating missing tags. Names are folded to
/// lowercase so a tag is shared regardless of how it was typed.
async fn attach_tags(
    tx: &mut Transaction<'_, Sqlite>,
    book_id: i64,
    names: &[String],
) -> RepoResult<()> {
    for name in names {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            continue;
        }
        sqlx::query("INSERT INTO tags (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(&name)
            .execute(&mut **tx)
            .await?;
        let tag_id: i64 = sqlx::query_scalar("SELECT id FROM tags WHERE name = ?")
            .bind(&name)
            .fetch_one(&mut **tx)
            .await?;
        sqlx::query("INSERT OR IGNORE INTO book_tags (book_id, tag_id) VALUES (?, ?)")
            .bind(book_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

fn not_found(uid: &str) -> RepoError {
    RepoError::NotFound(format!("Book `{}` not found", uid))
}

#[async_trait]
impl BookRepository for SqliteBookRepo {
    async fn create(&self, fields: BookFields) -> RepoResult<Book> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO books (
                uid, title, file_path, file_type, extension, cover_path,
                size_bytes, checksum, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id",
        )
        .bind(&fields.uid)
        .bind(&fields.title)
        .bind(&fields.file_path)
        .bind(&fields.file_type)
        .bind(&fields.extension)
        .bind(&fields.cover_path)
        .bind(fields.size_bytes)
        .bind(&fields.checksum)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        let book_id = match inserted {
            Ok(id) => id,
            Err(err) if is_unique_violation(&err) => {
                return Err(RepoError::DuplicateUid(fields.uid));
            }
            Err(err) => return Err(err.into()),
        };

        attach_tags(&mut tx, book_id, &fields.tags).await?;
        tx.commit().await?;

        self.find_by_uid(&fields.uid).await
    }

    async fn find_by_uid(&self, uid: &str) -> RepoResult<Book> {
        let sql = format!("{SELECT_BOOK} WHERE uid = ?");
        let mut book = sqlx::query_as::<_, Book>(&sql)
            .bind(uid)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => not_found(uid),
                other => RepoError::Sqlx(other),
            })?;
        book.tags = self.load_tags(book.id).await?;
        Ok(book)
    }

    async fn list(&self) -> RepoResult<Vec<Book>> {
        let sql = format!("{SELECT_BOOK} ORDER BY created_at DESC, id DESC");
        let mut books = sqlx::query_as::<_, Book>(&sql)
            .fetch_all(&*self.db)
            .await?;
        for book in &mut books {
            book.tags = self.load_tags(book.id).await?;
        }
        Ok(books)
    }

    async fn update(&self, uid: &str, fields: BookFields) -> RepoResult<Book> {
        let mut tx = self.db.begin().await?;

        let book_id = sqlx::query_scalar::<_, i64>(
            "UPDATE books SET
                title = ?, file_path = ?, file_type = ?, extension = ?,
                cover_path = ?, size_bytes = ?, checksum = ?, updated_at = ?
             WHERE uid = ?
             RETURNING id",
        )
        .bind(&fields.title)
        .bind(&fields.file_path)
        .bind(&fields.file_type)
        .bind(&fields.extension)
        .bind(&fields.cover_path)
        .bind(fields.size_bytes)
        .bind(&fields.checksum)
        .bind(Utc::now())
        .bind(uid)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(uid))?;

        sqlx::query("DELETE FROM book_tags WHERE book_id = ?")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;
        attach_tags(&mut tx, book_id, &fields.tags).await?;
        tx.commit().await?;

        self.find_by_uid(uid).await
    }

    async fn delete(&self, uid: &str) -> RepoResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM book_tags WHERE book_id IN (SELECT id FROM books WHERE uid = ?)")
            .bind(uid)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM books WHERE uid = ?")
            .bind(uid)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(uid));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_tags(&self) -> RepoResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY name")
            .fetch_all(&*self.db)
            .await?;
        Ok(tags)
    }
}
