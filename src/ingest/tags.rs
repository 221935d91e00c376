//! Tag validation, merging, and EPUB subject extraction.

use super::{IngestError, IngestResult, epub::EpubArchive};
use regex::Regex;
use std::{collections::HashSet, path::PathBuf, sync::LazyLock};
use tracing::{debug, warn};

pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_LEN: usize = 50;

static TAG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w\s-]+$").expect("valid regex"));
static SUBJECT_DELIMS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,;]+").expect("valid regex"));

/// A validated tag name: trimmed, internal whitespace collapsed, 1–50
/// characters of letters, digits, spaces, hyphens and underscores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagName(String);

impl TagName {
    pub fn parse(raw: &str) -> IngestResult<Self> {
        let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            return Err(IngestError::invalid(
                "Tag name cannot be empty or whitespace only",
            ));
        }
        if name.chars().count() > MAX_TAG_LEN {
            return Err(IngestError::invalid(format!(
                "Tag name must be between 1 and {MAX_TAG_LEN} characters"
            )));
        }
        if !TAG_CHARS.is_match(&name) {
            return Err(IngestError::invalid(
                "Tag name can only contain letters, numbers, spaces, hyphens, and underscores",
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-folded form used for comparison and storage.
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }
}

/// Validate a user-supplied tag list: at most `MAX_TAGS`, no two names equal
/// ignoring case.
pub fn validate_tags(tags: Vec<TagName>) -> IngestResult<Vec<TagName>> {
    if tags.len() > MAX_TAGS {
        return Err(IngestError::invalid(format!(
            "Maximum {MAX_TAGS} tags allowed per book"
        )));
    }
    let mut seen = HashSet::new();
    for tag in &tags {
        if !seen.insert(tag.key()) {
            return Err(IngestError::invalid("Duplicate tags are not allowed"));
        }
    }
    Ok(tags)
}

/// Parse the comma-separated `tags` form field. Blank pieces are skipped.
pub fn parse_tag_list(raw: &str) -> IngestResult<Vec<TagName>> {
    let tags = raw
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(TagName::parse)
        .collect::<IngestResult<Vec<_>>>()?;
    validate_tags(tags)
}

/// Merge user tags with extracted ones into case-folded names.
///
/// User entries come first and win on conflict; the result has no
/// duplicates. Extracted names that are not valid tags are dropped.
pub fn merge_tags<S: AsRef<str>>(user: &[TagName], extracted: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for tag in user {
        let key = tag.key();
        if seen.insert(key.clone()) {
            merged.push(key);
        }
    }

    for raw in extracted {
        match TagName::parse(raw.as_ref()) {
            Ok(tag) => {
                let key = tag.key();
                if seen.insert(key.clone()) {
                    merged.push(key);
                }
            }
            Err(err) => debug!("skipping extracted tag {:?}: {}", raw.as_ref(), err),
        }
    }

    merged
}

/// Split a subject field on runs of `,`/`;`, trimming and dropping blanks.
pub fn split_subjects(subject: &str) -> Vec<String> {
    SUBJECT_DELIMS
        .split(subject)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read subject tags from a stored EPUB. Never fails: problems are logged
/// and yield an empty list.
pub async fn extract_epub_tags(path: PathBuf) -> Vec<String> {
    let shown = path.display().to_string();
    let result = tokio::task::spawn_blocking(move || {
        EpubArchive::open(&path).map(|epub| epub.package().subject())
    })
    .await;

    match result {
        Ok(Ok(Some(subject))) => split_subjects(&subject),
        Ok(Ok(None)) => Vec::new(),
        Ok(Err(err)) => {
            warn!("tag extraction failed for {}: {}", shown, err);
            Vec::new()
        }
        Err(err) => {
            warn!("tag extraction task failed for {}: {}", shown, err);
            Vec::new()
        }
    }
}
