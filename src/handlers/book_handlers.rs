//! HTTP handlers for books and tags.
//! Upload bodies are staged part by part and handed to `BookService`; the
//! handlers only translate between wire shapes and service calls.

use super::multipart::{StagedFile, read_form};
use crate::{
    errors::AppError,
    ingest::tags::parse_tag_list,
    models::{
        book::{BookDetail, BookRead},
        tag::Tag,
    },
    services::{BookUpdate, BookUpload},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

fn parse_tags_field(raw: &str) -> Result<Vec<crate::ingest::tags::TagName>, AppError> {
    parse_tag_list(raw).map_err(|err| AppError::bad_request(format!("Invalid tags format: {}", err)))
}

/// `POST /books/upload`: multipart `title?`, `tags`, `file`, `cover?`.
pub async fn upload_book(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let limits = [
        ("file", state.config.max_upload_size),
        ("cover", state.config.max_cover_size),
    ];
    let mut form = read_form(multipart, &limits).await?;

    let tags = match form.take_text("tags") {
        Some(raw) => parse_tags_field(&raw)?,
        None => Vec::new(),
    };
    let file = form
        .take_file("file")
        .ok_or_else(|| AppError::bad_request("Book file is required"))?;
    let cover = form.take_file("cover").map(StagedFile::into_upload);

    let meta = BookUpload {
        title: form.take_text("title"),
        tags,
    };
    let book = state
        .books
        .upload_book(meta, file.into_upload(), cover)
        .await?;

    Ok((StatusCode::CREATED, Json(BookRead::from(&book))))
}

/// `GET /books`
pub async fn list_books(State(state): State<AppState>) -> Result<Json<Vec<BookRead>>, AppError> {
    let books = state.books.list_books().await?;
    Ok(Json(books.iter().map(BookRead::from).collect()))
}

/// `GET /books/{uid}`: includes tags.
pub async fn get_book(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<BookDetail>, AppError> {
    let book = state.books.get_book(&uid).await?;
    Ok(Json(BookDetail::from(&book)))
}

/// `PUT /books/{uid}`: multipart `title?`, `tags?`, `cover?`.
///
/// A present `tags` part replaces the tag set, even when empty.
pub async fn update_book(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    multipart: Multipart,
) -> Result<Json<BookDetail>, AppError> {
    let limits = [("cover", state.config.max_cover_size)];
    let mut form = read_form(multipart, &limits).await?;

    let tags = form
        .take_text("tags")
        .map(|raw| parse_tags_field(&raw))
        .transpose()?;
    let update = BookUpdate {
        title: form.take_text("title"),
        tags,
    };
    let cover = form.take_file("cover").map(StagedFile::into_upload);

    let book = state.books.update_book(&uid, update, cover).await?;
    Ok(Json(BookDetail::from(&book)))
}

/// `DELETE /books/{uid}`
pub async fn delete_book(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<StatusCode, AppError> {
    state.books.delete_book(&uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /tags`
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, AppError> {
    Ok(Json(state.books.list_tags().await?))
}
