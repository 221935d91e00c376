//! Identifier and filename generation for stored media.

use regex::Regex;
use std::{path::Path, sync::LazyLock};
use uuid::Uuid;

/// Length of the public identifier. Short enough for readable filenames;
/// uniqueness is re-checked against the repository before use.
pub const UID_LEN: usize = 8;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid regex"));

/// A fresh random identifier: the first `UID_LEN` hex digits of a v4 UUID.
pub fn generate_uid() -> String {
    let mut uid = Uuid::new_v4().simple().to_string();
    uid.truncate(UID_LEN);
    uid
}

/// Build `<clean_title>_<uid>.<extension>`.
///
/// The title is stripped of anything but word characters, whitespace and
/// hyphens, lowercased, and runs of whitespace/hyphens become a single `_`.
/// A title with nothing left after cleaning yields `<uid>.<extension>`.
pub fn file_name(title: &str, uid: &str, extension: &str) -> String {
    let stripped = NON_WORD.replace_all(title, "");
    let lowered = stripped.trim().to_lowercase();
    let clean = SEPARATORS.replace_all(&lowered, "_");

    if clean.is_empty() {
        format!("{uid}.{extension}")
    } else {
        format!("{clean}_{uid}.{extension}")
    }
}

/// Cover images are named after the record identifier alone.
pub fn cover_name(uid: &str, extension: &str) -> String {
    format!("{uid}.{extension}")
}

/// Lowercased text after the final `.`, if the name has one.
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Turn an upload filename into a display title:
/// `lesson_1-intro.pdf` becomes `Lesson 1 Intro`.
pub fn derive_title(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let spaced = stem.replace(['_', '-'], " ");
    title_case(&spaced).trim().to_string()
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_alpha = false;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}
