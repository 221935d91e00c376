//! Scope guard for files written during a single ingestion.

use std::path::PathBuf;
use tracing::{debug, warn};

/// Tracks every file written for the current operation. Unless `commit` is
/// called, dropping the guard removes them all, whichever way the operation
/// exits (error return, panic, or the request future being dropped).
///
/// Removal happens synchronously in `Drop` with `std::fs::remove_file`,
/// one unlink per tracked path, on whatever thread drops the guard.
/// Files written later by detached blocking tasks (see
/// `ThumbnailExtractor::generate`) are not covered.
#[derive(Debug, Default)]
pub struct Rollback {
    paths: Vec<PathBuf>,
    committed: bool,
}

impl Rollback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path before writing to it, so a partial write is covered.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Keep the written files.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("rolled back {}", path.display()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!("failed to roll back {}: {}", path.display(), err),
            }
        }
    }
}
