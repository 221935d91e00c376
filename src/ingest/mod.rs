//! Media ingestion pipeline building blocks.
//!
//! Each submodule is one step of getting an uploaded file onto disk:
//! signature sniffing, bounded streaming writes, name generation, cover
//! thumbnails and EPUB tag extraction. The orchestration lives in
//! `crate::services`.

pub mod epub;
pub mod naming;
pub mod rollback;
pub mod sniff;
pub mod tags;
pub mod thumbnail;
pub mod writer;

use crate::repositories::RepoError;
use std::io;
use thiserror::Error;

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    ContentMismatch(String),
    #[error("{label} too large ({:.2}MB). Max: {:.0}MB", megabytes(.size), megabytes(.limit))]
    SizeExceeded {
        label: &'static str,
        size: u64,
        limit: u64,
    },
    #[error("{0}")]
    NotFound(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / MIB
}

impl IngestError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<io::Error> for IngestError {
    fn from(err: io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<RepoError> for IngestError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => Self::NotFound(what),
            other => Self::Storage(other.to_string()),
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_exceeded_reports_megabytes() {
        let err = IngestError::SizeExceeded {
            label: "File",
            size: 3 * 1024 * 1024 + 512 * 1024,
            limit: 3 * 1024 * 1024,
        };
        assert_eq!(err.to_string(), "File too large (3.50MB). Max: 3MB");
    }

    #[test]
    fn repo_not_found_stays_distinct() {
        let err: IngestError = RepoError::NotFound("Book not found".into()).into();
        assert!(matches!(err, IngestError::NotFound(_)));
        let err: IngestError = RepoError::DuplicateUid("abcd1234".into()).into();
        assert!(matches!(err, IngestError::Storage(_)));
    }
}
