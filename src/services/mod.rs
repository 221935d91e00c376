//! Orchestrators that turn validated uploads into stored records.

pub mod book_service;
pub mod video_service;

pub use book_service::{BookService, BookUpdate, BookUpload};
pub use video_service::{VideoService, VideoUpload};

use crate::{
    config::IngestConfig,
    ingest::{IngestError, IngestResult, naming::extension_of},
};
use std::{io, path::Path};
use tokio::{fs, io::AsyncRead};
use tracing::{debug, warn};

/// Attempts at finding an unused identifier before giving up.
pub(crate) const UID_ATTEMPTS: usize = 5;

/// An incoming file: its declared name and type, and the byte source.
pub struct FileUpload<R> {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub reader: R,
}

impl<R: AsyncRead + Unpin + Send> FileUpload<R> {
    pub fn new(filename: impl Into<String>, reader: R) -> Self {
        Self {
            filename: Some(filename.into()),
            content_type: None,
            reader,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Trimmed filename, `None` when missing or blank.
    pub(crate) fn name(&self) -> Option<&str> {
        self.filename
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Declared content type, falling back to `application/<extension>`.
    pub(crate) fn content_type_or(&self, extension: &str) -> String {
        self.content_type
            .as_deref()
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("application/{extension}"))
    }
}

/// Lowercased extension of `filename`, required to be in `allowed`.
/// `kind` names the upload in messages ("file", "cover", "video").
pub(crate) fn allowed_extension(
    filename: &str,
    allowed: &[String],
    kind: &str,
) -> IngestResult<String> {
    let ext = extension_of(filename)
        .ok_or_else(|| IngestError::invalid(format!("{} must have an extension", capitalize(kind))))?;
    if !allowed.iter().any(|a| a == &ext) {
        return Err(IngestError::invalid(format!(
            "Invalid {} type '.{}'. Allowed: {}",
            kind,
            ext,
            allowed.join(", ")
        )));
    }
    Ok(ext)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Delete a file, logging instead of failing. Missing files are fine.
pub(crate) async fn remove_best_effort(path: &Path, what: &str) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("removed {} {}", what, path.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("{} {} already missing", what, path.display());
        }
        Err(err) => warn!("failed to delete {} {}: {}", what, path.display(), err),
    }
}

/// Create every storage directory the services write into.
pub async fn ensure_storage_dirs(config: &IngestConfig) -> io::Result<()> {
    for dir in [&config.upload_dir, &config.cover_dir, &config.video_dir] {
        if !dir.exists() {
            fs::create_dir_all(dir).await?;
            tracing::info!("Created storage directory at {}", dir.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn extension_must_be_allowed() {
        let allowed = list(&["pdf", "epub"]);
        assert_eq!(allowed_extension("A.PDF", &allowed, "file").unwrap(), "pdf");

        let err = allowed_extension("notes.txt", &allowed, "file").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid file type '.txt'. Allowed: pdf, epub"
        );

        let err = allowed_extension("cover", &allowed, "cover").unwrap_err();
        assert_eq!(err.to_string(), "Cover must have an extension");
    }

    #[test]
    fn content_type_falls_back_to_extension() {
        let upload = FileUpload::new("a.epub", &b""[..]);
        assert_eq!(upload.content_type_or("epub"), "application/epub");
        let upload = upload.with_content_type("application/epub+zip");
        assert_eq!(upload.content_type_or("epub"), "application/epub+zip");
    }
}
