//! Media ingestion backend for an offline library: books (PDF, EPUB) with
//! covers and tags, plus streamed videos.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;

/// The full application router with state attached.
pub fn app(state: state::AppState) -> Router {
    let body_limit = state.config.body_limit();
    routes::routes::routes(body_limit).with_state(state)
}
