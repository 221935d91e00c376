//! HTTP handlers for videos.
//! Video bodies are streamed from disk so large files never sit in memory.

use super::multipart::read_form;
use crate::{
    errors::AppError,
    models::video::{Video, VideoView},
    services::VideoUpload,
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// `POST /videos/upload`: multipart `title`, `description?`, `file`.
pub async fn upload_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let limits = [("file", state.config.max_video_size)];
    let mut form = read_form(multipart, &limits).await?;

    let file = form
        .take_file("file")
        .ok_or_else(|| AppError::bad_request("Video file is required"))?;
    let meta = VideoUpload {
        title: form.take_text("title"),
        description: form.take_text("description"),
    };
    let video = state.videos.upload_video(meta, file.into_upload()).await?;

    Ok((StatusCode::CREATED, Json(VideoView::from(&video))))
}

/// `GET /videos`
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<VideoView>>, AppError> {
    let videos = state.videos.list_videos().await?;
    Ok(Json(videos.iter().map(VideoView::from).collect()))
}

/// `GET /videos/{uid}`
pub async fn get_video(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<VideoView>, AppError> {
    let video = state.videos.get_video(&uid).await?;
    Ok(Json(VideoView::from(&video)))
}

/// `GET /videos/{uid}/stream`
pub async fn stream_video(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Response, AppError> {
    let (video, file) = state.videos.open_stream(&uid).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    set_video_headers(response.headers_mut(), &video);
    Ok(response)
}

/// `DELETE /videos/{uid}`
pub async fn delete_video(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<StatusCode, AppError> {
    state.videos.delete_video(&uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn set_video_headers(headers: &mut HeaderMap, video: &Video) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&video.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(video.size_bytes.max(0) as u64),
    );

    let quoted = format!("\"{}\"", video.checksum);
    if let Ok(value) = HeaderValue::from_str(&quoted) {
        headers.insert(header::ETAG, value);
    }
}
