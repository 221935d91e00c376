use super::{RepoError, RepoResult, is_unique_violation};
use crate::models::video::{Video, VideoFields};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;

#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create(&self, fields: VideoFields) -> RepoResult<Video>;
    async fn find_by_uid(&self, uid: &str) -> RepoResult<Video>;
    async fn list(&self) -> RepoResult<Vec<Video>>;
    async fn delete(&self, uid: &str) -> RepoResult<()>;
}

const SELECT_VIDEO: &str = "SELECT id, uid, title, description, file_path, content_type,
        extension, size_bytes, checksum, created_at
 FROM videos";

#[derive(Clone)]
pub struct SqliteVideoRepo {
    db: Arc<SqlitePool>,
}

impl SqliteVideoRepo {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoRepository for SqliteVideoRepo {
    async fn create(&self, fields: VideoFields) -> RepoResult<Video> {
        let sql = "INSERT INTO videos (
                uid, title, description, file_path, content_type, extension,
                size_bytes, checksum, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, uid, title, description, file_path, content_type,
                      extension, size_bytes, checksum, created_at";

        sqlx::query_as::<_, Video>(sql)
            .bind(&fields.uid)
            .bind(&fields.title)
            .bind(&fields.description)
            .bind(&fields.file_path)
            .bind(&fields.content_type)
            .bind(&fields.extension)
            .bind(fields.size_bytes)
            .bind(&fields.checksum)
            .bind(Utc::now())
            .fetch_one(&*self.db)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    RepoError::DuplicateUid(fields.uid.clone())
                } else {
                    RepoError::Sqlx(err)
                }
            })
    }

    async fn find_by_uid(&self, uid: &str) -> RepoResult<Video> {
        let sql = format!("{SELECT_VIDEO} WHERE uid = ?");
        sqlx::query_as::<_, Video>(&sql)
            .bind(uid)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => RepoError::NotFound(format!("Video `{}` not found", uid)),
                other => RepoError::Sqlx(other),
            })
    }

    async fn list(&self) -> RepoResult<Vec<Video>> {
        let sql = format!("{SELECT_VIDEO} ORDER BY created_at DESC, id DESC");
        Ok(sqlx::query_as::<_, Video>(&sql).fetch_all(&*self.db).await?)
    }

    async fn delete(&self, uid: &str) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM videos WHERE uid = ?")
            .bind(uid)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("Video `{}` not found", uid)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn fields(uid: &str) -> VideoFields {
        VideoFields {
            uid: uid.to_string(),
            title: "Clip".into(),
            description: None,
            file_path: format!("clip_{uid}.mp4"),
            content_type: "video/mp4".into(),
            extension: "mp4".into(),
            size_bytes: 42,
            checksum: "abc".into(),
        }
    }

    #[tokio::test]
    async fn create_find_delete() {
        let repo = SqliteVideoRepo::new(Arc::new(db::connect_in_memory().await.unwrap()));
        repo.create(fields("v1")).await.unwrap();

        let err = repo.create(fields("v1")).await.unwrap_err();
        assert!(matches!(err, RepoError::DuplicateUid(_)));

        assert_eq!(repo.find_by_uid("v1").await.unwrap().size_bytes, 42);
        assert_eq!(repo.list().await.unwrap().len(), 1);

        repo.delete("v1").await.unwrap();
        assert!(matches!(repo.find_by_uid("v1").await, Err(RepoError::NotFound(_))));
        assert!(matches!(repo.delete("v1").await, Err(RepoError::NotFound(_))));
    }
}
