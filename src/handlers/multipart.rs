//! Multipart form collection for upload routes.
//!
//! Multipart parts arrive strictly in sequence, but the ingestion services
//! need the title, tags and every file at once. File parts are therefore
//! staged into anonymous temp files (deleted on drop) and handed over as
//! `AsyncRead`s; text parts are kept as strings. Staging copies at most
//! `limit + 1` bytes of each file part, which is enough for the services to
//! detect an oversized upload without holding it in memory or on disk.

use crate::{errors::AppError, services::FileUpload};
use axum::extract::{
    Multipart,
    multipart::{Field, MultipartError},
};
use std::{collections::HashMap, io::SeekFrom};
use tokio::{
    fs::File,
    io::{AsyncSeekExt, AsyncWriteExt},
};
use tracing::debug;

/// A file part copied to a temp file and rewound to its start.
pub struct StagedFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub file: File,
    pub staged_bytes: u64,
}

impl StagedFile {
    pub fn into_upload(self) -> FileUpload<File> {
        FileUpload {
            filename: self.filename,
            content_type: self.content_type,
            reader: self.file,
        }
    }
}

/// Collected text fields and staged file parts of one request.
#[derive(Default)]
pub struct MediaForm {
    texts: HashMap<String, String>,
    files: HashMap<String, StagedFile>,
}

impl MediaForm {
    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.texts.remove(name)
    }

    pub fn take_file(&mut self, name: &str) -> Option<StagedFile> {
        self.files.remove(name)
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}

/// Read every part of `multipart`. Parts named in `file_limits` are staged
/// with the paired byte ceiling; all other parts are read as text. A
/// repeated part name keeps the last occurrence.
pub async fn read_form(
    mut multipart: Multipart,
    file_limits: &[(&str, u64)],
) -> Result<MediaForm, AppError> {
    let mut form = MediaForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match file_limits.iter().find(|(part, _)| *part == name) {
            Some((_, limit)) => {
                let staged = stage_field(field, *limit).await?;
                debug!("staged part `{}` ({} bytes)", name, staged.staged_bytes);
                form.files.insert(name, staged);
            }
            None => {
                let text = field.text().await.map_err(multipart_error)?;
                form.texts.insert(name, text);
            }
        }
    }

    Ok(form)
}

/// Copy a file part into an anonymous temp file, keeping at most
/// `limit + 1` bytes. The rest of an oversized part is drained unread.
async fn stage_field(mut field: Field<'_>, limit: u64) -> Result<StagedFile, AppError> {
    let filename = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);

    let std_file = tokio::task::spawn_blocking(tempfile::tempfile)
        .await
        .map_err(|err| AppError::internal(format!("staging task failed: {}", err)))??;
    let mut file = File::from_std(std_file);

    let cap = limit.saturating_add(1);
    let mut staged_bytes = 0u64;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        let remaining = cap - staged_bytes;
        if remaining == 0 {
            continue;
        }
        let take = chunk.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        file.write_all(&chunk[..take]).await?;
        staged_bytes += take as u64;
    }

    file.flush().await?;
    file.seek(SeekFrom::Start(0)).await?;

    Ok(StagedFile {
        filename,
        content_type,
        file,
        staged_bytes,
    })
}
