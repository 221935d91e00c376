//! HTTP surface tests driven through the router with multipart bodies.

mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::{JPEG_BYTES, PNG_BYTES, epub_bytes, fixture, pdf_bytes};
use offline_library::{app, state::AppState};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "X-LIBRARY-BOUNDARY";

enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(method: &str, uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let body = multipart_body(parts);
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 10_000_000)
        .await
        .expect("body");
    (status, bytes.to_vec())
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(router, request).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn router() -> (common::Fixture, Router) {
    let fx = fixture().await;
    let state = AppState::new(fx.db.clone(), fx.config.clone());
    (fx, app(state))
}

#[tokio::test]
async fn health_and_readiness() {
    let (_fx, router) = router().await;

    let (status, body) = send_json(&router, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send_json(&router, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["sqlite"]["ok"], true);
    assert_eq!(body["checks"]["covers"]["ok"], true);
}

#[tokio::test]
async fn book_lifecycle_over_http() {
    let (_fx, router) = router().await;
    let epub = epub_bytes(&["History, Africa; Economy"], JPEG_BYTES);

    let (status, created) = send_json(
        &router,
        multipart_request(
            "POST",
            "/books/upload",
            &[
                Part::Text("title", "Trade Routes"),
                Part::Text("tags", "history"),
                Part::File {
                    name: "file",
                    filename: "routes.epub",
                    content_type: "application/epub+zip",
                    data: &epub,
                },
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let uid = created["uid"].as_str().expect("uid").to_string();
    assert_eq!(created["title"], "Trade Routes");
    assert_eq!(created["extension"], "epub");
    let cover_url = created["cover_url"].as_str().expect("cover url").to_string();
    assert_eq!(cover_url, format!("/static/covers/{uid}.jpg"));

    let (status, cover) = send(&router, get(&cover_url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cover, JPEG_BYTES);

    let (status, list) = send_json(&router, get("/books")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, tags) = send_json(&router, get("/tags")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tags.as_array().map(Vec::len), Some(3));

    let (status, updated) = send_json(
        &router,
        multipart_request(
            "PUT",
            &format!("/books/{uid}"),
            &[
                Part::Text("title", "Routes Revised"),
                Part::Text("tags", "maps"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Routes Revised");
    assert_eq!(updated["tags"][0]["name"], "maps");
    assert_eq!(updated["cover_url"], cover_url.as_str());

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/books/{uid}"))
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&router, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send_json(&router, get(&format!("/books/{uid}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn upload_errors_map_to_statuses() {
    let (fx, router) = router().await;
    let pdf = pdf_bytes();

    let (status, body) = send_json(
        &router,
        multipart_request("POST", "/books/upload", &[Part::Text("title", "Nothing")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Book file is required");

    let (status, body) = send_json(
        &router,
        multipart_request(
            "POST",
            "/books/upload",
            &[Part::File {
                name: "file",
                filename: "fake.pdf",
                content_type: "application/pdf",
                data: PNG_BYTES,
            }],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File does not appear to be a valid PDF");

    let (status, body) = send_json(
        &router,
        multipart_request(
            "POST",
            "/books/upload",
            &[
                Part::Text("tags", "ok, not/ok"),
                Part::File {
                    name: "file",
                    filename: "book.pdf",
                    content_type: "application/pdf",
                    data: &pdf,
                },
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.starts_with("Invalid tags format"))
    );

    assert_eq!(common::file_count(&fx.config.upload_dir), 0);
}

#[tokio::test]
async fn oversized_book_is_rejected_with_413() {
    let mut fx = fixture().await;
    fx.config.max_upload_size = 16;
    let router = app(AppState::new(fx.db.clone(), fx.config.clone()));
    let pdf = pdf_bytes();

    let (status, _) = send_json(
        &router,
        multipart_request(
            "POST",
            "/books/upload",
            &[Part::File {
                name: "file",
                filename: "big.pdf",
                content_type: "application/pdf",
                data: &pdf,
            }],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(common::file_count(&fx.config.upload_dir), 0);
}

#[tokio::test]
async fn video_stream_sets_headers() {
    let (_fx, router) = router().await;
    let mut mp4 = vec![0x00, 0x00, 0x00, 0x18];
    mp4.extend_from_slice(b"ftypisom");
    mp4.extend_from_slice(&[7u8; 100]);

    let (status, created) = send_json(
        &router,
        multipart_request(
            "POST",
            "/videos/upload",
            &[
                Part::Text("title", "Harvest"),
                Part::File {
                    name: "file",
                    filename: "harvest.mp4",
                    content_type: "video/mp4",
                    data: &mp4,
                },
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let stream_url = created["video_url"].as_str().expect("video url").to_string();

    let response = router
        .clone()
        .oneshot(get(&stream_url))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(headers[header::CONTENT_LENGTH], mp4.len().to_string().as_str());
    let etag = format!("\"{:x}\"", md5::compute(&mp4));
    assert_eq!(headers[header::ETAG], etag.as_str());
    let body = to_bytes(response.into_body(), 1_000_000).await.expect("body");
    assert_eq!(body.as_ref(), mp4.as_slice());
}

#[tokio::test]
async fn cover_names_cannot_escape_the_cover_dir() {
    let (_fx, router) = router().await;
    let (status, _) = send(&router, get("/static/covers/..%2Flibrary.db")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&router, get("/static/covers/missing.jpg")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
