//! VideoService: upload, listing, streaming and removal of videos.

use super::{
    FileUpload, UID_ATTEMPTS, allowed_extension, book_service::normalize_title, remove_best_effort,
};
use crate::{
    config::IngestConfig,
    ingest::{
        IngestError, IngestResult,
        naming::{self, generate_uid},
        rollback::Rollback,
        sniff::sniff,
        writer::{CHUNK_SIZE, read_header, write_bounded},
    },
    models::video::{Video, VideoFields},
    repositories::{RepoError, VideoRepository},
};
use std::{io, sync::Arc};
use tokio::{fs::File, io::AsyncRead};
use tracing::info;

pub const MAX_DESCRIPTION_LEN: usize = 2000;

#[derive(Debug, Clone, Default)]
pub struct VideoUpload {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct VideoService {
    repo: Arc<dyn VideoRepository>,
    config: Arc<IngestConfig>,
}

impl VideoService {
    pub fn new(repo: Arc<dyn VideoRepository>, config: Arc<IngestConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn get_video(&self, uid: &str) -> IngestResult<Video> {
        Ok(self.repo.find_by_uid(uid).await?)
    }

    pub async fn list_videos(&self) -> IngestResult<Vec<Video>> {
        Ok(self.repo.list().await?)
    }

    /// Store a new video. Unlike books, a title is required.
    pub async fn upload_video<R>(
        &self,
        meta: VideoUpload,
        mut file: FileUpload<R>,
    ) -> IngestResult<Video>
    where
        R: AsyncRead + Unpin + Send,
    {
        let title = normalize_title(meta.title.as_deref())?
            .ok_or_else(|| IngestError::invalid("Video title is required"))?;
        let description = meta
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
        {
            return Err(IngestError::invalid(format!(
                "Description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }

        let filename = file
            .name()
            .ok_or_else(|| IngestError::invalid("Video filename is required"))?
            .to_string();
        let extension =
            allowed_extension(&filename, &self.config.allowed_video_extensions, "video")?;
        let header = read_header(&mut file.reader, CHUNK_SIZE, "Video").await?;
        sniff(&header, &extension)?;

        let uid = self.unique_uid().await?;
        let file_name = naming::file_name(&title, &uid, &extension);
        let path = self.config.video_dir.join(&file_name);

        let mut rollback = Rollback::new();
        rollback.track(&path);
        let written = write_bounded(
            &header,
            &mut file.reader,
            &path,
            self.config.max_video_size,
            "Video",
        )
        .await?;

        let content_type = file
            .content_type
            .clone()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| format!("video/{extension}"));

        let video = self
            .repo
            .create(VideoFields {
                uid,
                title,
                description,
                file_path: file_name,
                content_type,
                extension,
                size_bytes: i64::try_from(written.size_bytes).unwrap_or(i64::MAX),
                checksum: written.checksum,
            })
            .await?;
        rollback.commit();

        info!("uploaded video {} ({})", video.uid, video.title);
        Ok(video)
    }

    /// Open a video for streaming. A record whose file has gone missing is
    /// reported as not found.
    pub async fn open_stream(&self, uid: &str) -> IngestResult<(Video, File)> {
        let video = self.repo.find_by_uid(uid).await?;
        let path = self.config.video_dir.join(&video.file_path);
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                IngestError::NotFound(format!("Video `{}` file is missing", uid))
            } else {
                IngestError::from(err)
            }
        })?;
        Ok((video, file))
    }

    pub async fn delete_video(&self, uid: &str) -> IngestResult<()> {
        let existing = self.repo.find_by_uid(uid).await?;
        remove_best_effort(&self.config.video_dir.join(&existing.file_path), "video file").await;

        self.repo.delete(uid).await.map_err(|err| match err {
            RepoError::NotFound(msg) => IngestError::NotFound(msg),
            other => IngestError::Storage(format!("Failed to delete video: {}", other)),
        })?;

        info!("deleted video {}", uid);
        Ok(())
    }

    async fn unique_uid(&self) -> IngestResult<String> {
        for _ in 0..UID_ATTEMPTS {
            let uid = generate_uid();
            match self.repo.find_by_uid(&uid).await {
                Err(RepoError::NotFound(_)) => return Ok(uid),
                Ok(_) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(IngestError::Storage(
            "could not allocate a unique identifier".into(),
        ))
    }
}
