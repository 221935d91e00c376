//! BookService: ingestion, update and removal of books.
//!
//! A book upload is validated, streamed to the upload directory under a
//! generated name, given a cover (uploaded or extracted), tagged, and only
//! then handed to the repository. Every file written along the way is
//! tracked by a `Rollback` guard so a failure leaves nothing behind.

use super::{FileUpload, UID_ATTEMPTS, allowed_extension, remove_best_effort};
use crate::{
    config::IngestConfig,
    ingest::{
        IngestError, IngestResult,
        naming::{self, derive_title, generate_uid},
        rollback::Rollback,
        sniff::sniff,
        tags::{TagName, extract_epub_tags, merge_tags, validate_tags},
        thumbnail::ThumbnailExtractor,
        writer::{CHUNK_SIZE, read_header, write_bounded},
    },
    models::{
        book::{Book, BookFields},
        tag::Tag,
    },
    repositories::{BookRepository, RepoError},
};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

pub const MAX_TITLE_LEN: usize = 255;
const FORBIDDEN_TITLE_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Metadata accompanying a new book.
#[derive(Debug, Clone, Default)]
pub struct BookUpload {
    /// Blank or missing titles are derived from the filename.
    pub title: Option<String>,
    pub tags: Vec<TagName>,
}

/// Changes to an existing book. `tags: Some(vec![])` clears the tag set;
/// `None` keeps it.
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub tags: Option<Vec<TagName>>,
}

/// Collapse whitespace and reject characters that are unsafe in titles.
/// Returns `None` for a missing or blank title.
pub fn normalize_title(raw: Option<&str>) -> IngestResult<Option<String>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        return Ok(None);
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(IngestError::invalid(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    if title.contains(FORBIDDEN_TITLE_CHARS) {
        return Err(IngestError::invalid("Title contains invalid characters"));
    }
    Ok(Some(title))
}

#[derive(Clone)]
pub struct BookService {
    repo: Arc<dyn BookRepository>,
    config: Arc<IngestConfig>,
    thumbnails: ThumbnailExtractor,
}

impl BookService {
    pub fn new(repo: Arc<dyn BookRepository>, config: Arc<IngestConfig>) -> Self {
        let thumbnails = ThumbnailExtractor::new(config.pdfium_dir.clone());
        Self {
            repo,
            config,
            thumbnails,
        }
    }

    pub async fn get_book(&self, uid: &str) -> IngestResult<Book> {
        Ok(self.repo.find_by_uid(uid).await?)
    }

    pub async fn list_books(&self) -> IngestResult<Vec<Book>> {
        Ok(self.repo.list().await?)
    }

    pub async fn list_tags(&self) -> IngestResult<Vec<Tag>> {
        Ok(self.repo.list_tags().await?)
    }

    /// Ingest a new book and its optional cover.
    ///
    /// Nothing is written until the title, extension, tags and content
    /// signature have been checked. Without an uploaded cover a thumbnail
    /// is extracted from the document; failing that the book simply has no
    /// cover. EPUB subjects are merged into the tag set.
    pub async fn upload_book<R>(
        &self,
        meta: BookUpload,
        mut file: FileUpload<R>,
        cover: Option<FileUpload<R>>,
    ) -> IngestResult<Book>
    where
        R: AsyncRead + Unpin + Send,
    {
        let filename = file
            .name()
            .ok_or_else(|| IngestError::invalid("Book filename is required"))?
            .to_string();
        let title = match normalize_title(meta.title.as_deref())? {
            Some(title) => title,
            None => derive_title(&filename),
        };
        let user_tags = validate_tags(meta.tags)?;

        let extension = allowed_extension(&filename, &self.config.allowed_extensions, "file")?;
        let header = read_header(&mut file.reader, CHUNK_SIZE, "Book").await?;
        sniff(&header, &extension)?;

        let uid = self.unique_uid().await?;
        let file_name = naming::file_name(&title, &uid, &extension);
        let file_path = self.config.upload_dir.join(&file_name);

        let mut rollback = Rollback::new();
        rollback.track(&file_path);
        let written = write_bounded(
            &header,
            &mut file.reader,
            &file_path,
            self.config.max_upload_size,
            "File",
        )
        .await?;
        debug!("stored {} ({} bytes)", file_path.display(), written.size_bytes);

        let cover_path = match cover.filter(|c| c.name().is_some()) {
            Some(mut cover) => Some(self.store_cover(&uid, &mut cover, &mut rollback).await?),
            None => {
                let name = naming::cover_name(&uid, "jpg");
                let out = self.config.cover_dir.join(&name);
                rollback.track(&out);
                if self.thumbnails.generate(&file_path, &out, &extension).await {
                    Some(name)
                } else {
                    remove_best_effort(&out, "partial thumbnail").await;
                    None
                }
            }
        };

        let extracted = if extension == "epub" {
            extract_epub_tags(file_path.clone()).await
        } else {
            Vec::new()
        };
        let tags = merge_tags(&user_tags, &extracted);

        let fields = BookFields {
            uid,
            title,
            file_path: file_name,
            file_type: file.content_type_or(&extension),
            extension,
            cover_path,
            size_bytes: i64::try_from(written.size_bytes).unwrap_or(i64::MAX),
            checksum: written.checksum,
            tags,
        };

        let book = self.repo.create(fields).await?;
        rollback.commit();

        info!("uploaded book {} ({})", book.uid, book.title);
        Ok(book)
    }

    /// Update title, cover and/or tags of an existing book. The document
    /// itself never changes.
    ///
    /// A replacement cover is checked before the old one is deleted. If
    /// writing it still fails, the book is left without a cover rather than
    /// pointing at the deleted file; other changes in `update` are dropped.
    pub async fn update_book<R>(
        &self,
        uid: &str,
        update: BookUpdate,
        cover: Option<FileUpload<R>>,
    ) -> IngestResult<Book>
    where
        R: AsyncRead + Unpin + Send,
    {
        let existing = self.repo.find_by_uid(uid).await?;
        let mut fields = BookFields::from(&existing);

        if let Some(title) = normalize_title(update.title.as_deref())? {
            fields.title = title;
        }
        if let Some(tags) = update.tags {
            let tags = validate_tags(tags)?;
            fields.tags = merge_tags::<&str>(&tags, &[]);
        }

        let mut rollback = Rollback::new();
        if let Some(mut cover) = cover.filter(|c| c.name().is_some()) {
            let (extension, header) = self.check_cover(&mut cover).await?;

            if let Some(old) = &existing.cover_path {
                remove_best_effort(&self.config.cover_dir.join(old), "old cover").await;
            }

            let name = naming::cover_name(uid, &extension);
            let path = self.config.cover_dir.join(&name);
            rollback.track(&path);
            let written = write_bounded(
                &header,
                &mut cover.reader,
                &path,
                self.config.max_cover_size,
                "Cover",
            )
            .await;
            if let Err(err) = written {
                if existing.cover_path.is_some() {
                    self.forget_cover(&existing).await;
                }
                return Err(err);
            }
            fields.cover_path = Some(name);
        }

        let book = self.repo.update(uid, fields).await?;
        rollback.commit();

        info!("updated book {}", uid);
        Ok(book)
    }

    /// Remove a book's files and record. File removal is best-effort;
    /// failing to remove the record is an error.
    pub async fn delete_book(&self, uid: &str) -> IngestResult<()> {
        let existing = self.repo.find_by_uid(uid).await?;

        remove_best_effort(
            &self.config.upload_dir.join(&existing.file_path),
            "book file",
        )
        .await;
        if let Some(cover) = &existing.cover_path {
            remove_best_effort(&self.config.cover_dir.join(cover), "cover file").await;
        }

        self.repo.delete(uid).await.map_err(|err| match err {
            RepoError::NotFound(msg) => IngestError::NotFound(msg),
            other => IngestError::Storage(format!("Failed to delete book: {}", other)),
        })?;

        info!("deleted book {}", uid);
        Ok(())
    }

    /// Clear `cover_path` after the old cover file is gone. Best-effort: the
    /// caller is already returning an error.
    async fn forget_cover(&self, existing: &Book) {
        let mut fields = BookFields::from(existing);
        fields.cover_path = None;
        match self.repo.update(&existing.uid, fields).await {
            Ok(_) => debug!("cleared cover of {}", existing.uid),
            Err(err) => warn!("failed to clear cover of {}: {}", existing.uid, err),
        }
    }

    /// Validate a cover's extension and signature, returning the extension
    /// and the header bytes already consumed from the stream.
    async fn check_cover<R>(&self, cover: &mut FileUpload<R>) -> IngestResult<(String, Vec<u8>)>
    where
        R: AsyncRead + Unpin + Send,
    {
        let filename = cover.name().unwrap_or_default().to_string();
        let extension =
            allowed_extension(&filename, &self.config.allowed_image_extensions, "cover")?;
        let header = read_header(&mut cover.reader, CHUNK_SIZE, "Cover").await?;
        sniff(&header, &extension)?;
        Ok((extension, header))
    }

    async fn store_cover<R>(
        &self,
        uid: &str,
        cover: &mut FileUpload<R>,
        rollback: &mut Rollback,
    ) -> IngestResult<String>
    where
        R: AsyncRead + Unpin + Send,
    {
        let (extension, header) = self.check_cover(cover).await?;
        let name = naming::cover_name(uid, &extension);
        let path = self.config.cover_dir.join(&name);
        rollback.track(&path);
        write_bounded(
            &header,
            &mut cover.reader,
            &path,
            self.config.max_cover_size,
            "Cover",
        )
        .await?;
        Ok(name)
    }

    async fn unique_uid(&self) -> IngestResult<String> {
        for _ in 0..UID_ATTEMPTS {
            let uid = generate_uid();
            match self.repo.find_by_uid(&uid).await {
                Err(RepoError::NotFound(_)) => return Ok(uid),
                Ok(_) => debug!("uid {} already taken, regenerating", uid),
                Err(err) => return Err(err.into()),
            }
        }
        Err(IngestError::Storage(
            "could not allocate a unique identifier".into(),
        ))
    }
}
