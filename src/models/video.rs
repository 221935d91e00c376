//! Videos: a single streamed media file with a title and description.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Video {
    pub id: i64,
    pub uid: String,
    pub title: String,
    pub description: Option<String>,
    /// Stored filename inside the video directory.
    pub file_path: String,
    pub content_type: String,
    pub extension: String,
    pub size_bytes: i64,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VideoFields {
    pub uid: String,
    pub title: String,
    pub description: Option<String>,
    pub file_path: String,
    pub content_type: String,
    pub extension: String,
    pub size_bytes: i64,
    pub checksum: String,
}

/// Public shape; the file itself is reached through `video_url`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct VideoView {
    pub uid: String,
    pub title: String,
    pub description: Option<String>,
    pub content_type: String,
    pub size_bytes: i64,
    pub video_url: String,
}

impl From<&Video> for VideoView {
    fn from(video: &Video) -> Self {
        Self {
            uid: video.uid.clone(),
            title: video.title.clone(),
            description: video.description.clone(),
            content_type: video.content_type.clone(),
            size_bytes: video.size_bytes,
            video_url: format!("/videos/{}/stream", video.uid),
        }
    }
}
